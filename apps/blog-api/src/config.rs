//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use blog_core::PostSettings;
use blog_infra::JwtConfig;
use blog_infra::database::DatabaseConfig;

#[cfg(feature = "redis")]
use blog_infra::RedisConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    pub uploads: UploadConfig,
    pub posts: PostSettings,
    pub jwt: JwtConfig,
}

/// Where cover uploads are written and served from.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub root: PathBuf,
    pub public_url: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = PostSettings::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            database: DatabaseConfig::from_env(),
            #[cfg(feature = "redis")]
            redis: env::var("REDIS_URL").ok().map(|_| RedisConfig::from_env()),
            uploads: UploadConfig {
                root: env::var("UPLOAD_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("storage/app")),
                public_url: env::var("UPLOAD_PUBLIC_URL").unwrap_or_else(|_| "/storage".to_string()),
            },
            posts: PostSettings {
                cache_ttl: parse_var::<u64>("CACHE_TTL_MINUTES")
                    .map(|minutes| Duration::from_secs(minutes * 60))
                    .unwrap_or(defaults.cache_ttl),
                cover_max_height: parse_var("COVER_MAX_HEIGHT").unwrap_or(defaults.cover_max_height),
                cover_quality: parse_var::<u8>("COVER_QUALITY")
                    .map(|q| q.clamp(1, 100))
                    .unwrap_or(defaults.cover_quality),
            },
            jwt: JwtConfig::from_env(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_ignores_garbage() {
        // SAFETY: test-local variable names, not read by any other test.
        unsafe {
            env::set_var("BLOG_TEST_PORT_OK", " 9000 ");
            env::set_var("BLOG_TEST_PORT_BAD", "ninety");
        }
        assert_eq!(parse_var::<u16>("BLOG_TEST_PORT_OK"), Some(9000));
        assert_eq!(parse_var::<u16>("BLOG_TEST_PORT_BAD"), None);
        assert_eq!(parse_var::<u16>("BLOG_TEST_PORT_MISSING"), None);
    }
}
