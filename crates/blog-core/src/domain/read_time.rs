use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// Estimated reading time of a post body, rounded up to whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadTime {
    pub minutes: u32,
}

impl ReadTime {
    pub fn estimate(content: &str, words_per_minute: u32) -> Self {
        let words = content.split_whitespace().count() as u32;
        let wpm = words_per_minute.max(1);
        Self {
            minutes: words.div_ceil(wpm).max(1),
        }
    }
}

impl fmt::Display for ReadTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min read", self.minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_reads_in_one_minute() {
        assert_eq!(ReadTime::estimate("", 200).minutes, 1);
        assert_eq!(ReadTime::estimate("a few words", 200).minutes, 1);
    }

    #[test]
    fn test_rounds_up() {
        let content = "word ".repeat(401);
        let time = ReadTime::estimate(&content, DEFAULT_WORDS_PER_MINUTE);
        assert_eq!(time.minutes, 3);
        assert_eq!(time.to_string(), "3 min read");
    }
}
