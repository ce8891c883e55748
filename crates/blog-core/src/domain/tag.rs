use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag attached to posts through an ordered join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug::slugify(name),
        }
    }
}

/// Trim, drop blanks and de-duplicate while keeping first-seen order.
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut seen = Vec::<String>::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag_names() {
        let names = vec![
            " rust ".to_string(),
            "".to_string(),
            "web".to_string(),
            "rust".to_string(),
        ];
        assert_eq!(normalize_tag_names(&names), vec!["rust", "web"]);
    }
}
