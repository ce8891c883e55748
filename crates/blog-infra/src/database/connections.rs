use std::env;

#[cfg(feature = "postgres")]
use std::sync::Arc;
#[cfg(feature = "postgres")]
use std::time::Duration;

#[cfg(feature = "postgres")]
use sea_orm::{ConnectOptions, Database, DbConn, DbErr};

/// Configuration for the main database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub main_url: String,
    pub main_max_connections: u32,
    pub main_min_connections: u32,
    pub secondary_databases: Vec<SecondaryDbConfig>,
}

/// Configuration for a secondary database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryDbConfig {
    pub name: String,
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Read `DATABASE_URL` and friends. `None` when no database is configured.
    pub fn from_env() -> Option<Self> {
        let main_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty())?;

        Some(Self {
            main_url,
            main_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            main_min_connections: env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            secondary_databases: parse_secondary_databases(env::vars()),
        })
    }
}

/// Parse `SECONDARY_DB_<NAME>=<URL>[,<MAX_CONNECTIONS>]` entries.
fn parse_secondary_databases(vars: impl Iterator<Item = (String, String)>) -> Vec<SecondaryDbConfig> {
    let mut secondary: Vec<SecondaryDbConfig> = vars
        .filter_map(|(key, value)| {
            let name = key.strip_prefix("SECONDARY_DB_")?;
            let (url, max) = match value.split_once(',') {
                Some((url, max)) => (url, max.trim().parse().ok()),
                None => (value.as_str(), None),
            };
            (!url.is_empty()).then(|| SecondaryDbConfig {
                name: name.to_lowercase(),
                url: url.to_string(),
                max_connections: max.unwrap_or(20),
            })
        })
        .collect();
    secondary.sort_by(|a, b| a.name.cmp(&b.name));
    secondary
}

/// A named connection to a secondary database.
#[cfg(feature = "postgres")]
pub struct NamedConnection {
    pub name: String,
    pub conn: DbConn,
}

#[cfg(not(feature = "postgres"))]
pub struct NamedConnection {
    pub name: String,
}

/// Multi-database connection manager.
///
/// Posts live in the main database. Secondary databases are opened when
/// configured and looked up by name.
#[cfg(feature = "postgres")]
pub struct DatabaseConnections {
    pub main: Arc<DbConn>,
    pub secondary: Vec<NamedConnection>,
}

#[cfg(not(feature = "postgres"))]
pub struct DatabaseConnections {
    pub secondary: Vec<NamedConnection>,
}

#[cfg(feature = "postgres")]
impl DatabaseConnections {
    /// Initialize all database connections from configuration.
    pub async fn init(config: &DatabaseConfig) -> Result<Self, DbErr> {
        tracing::info!("Initializing database connections...");

        let main_opts = ConnectOptions::new(&config.main_url)
            .max_connections(config.main_max_connections)
            .min_connections(config.main_min_connections)
            .connect_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(false)
            .to_owned();

        let main = Database::connect(main_opts).await?;
        tracing::info!(pool = config.main_max_connections, "Main database connected");

        let mut secondary = Vec::with_capacity(config.secondary_databases.len());
        for db_config in &config.secondary_databases {
            let opts = ConnectOptions::new(&db_config.url)
                .max_connections(db_config.max_connections)
                .min_connections(2)
                .connect_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(300))
                .sqlx_logging(false)
                .to_owned();

            let conn = Database::connect(opts).await?;
            tracing::info!(
                name = %db_config.name,
                pool = db_config.max_connections,
                "Secondary database connected"
            );

            secondary.push(NamedConnection {
                name: db_config.name.clone(),
                conn,
            });
        }

        Ok(Self {
            main: Arc::new(main),
            secondary,
        })
    }

    /// Get a secondary database connection by name.
    pub fn get(&self, name: &str) -> Option<&DbConn> {
        self.secondary
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.conn)
    }

    /// Round-trip to the main database.
    pub async fn ping(&self) -> bool {
        match self.main.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Database ping failed");
                false
            }
        }
    }
}

#[cfg(not(feature = "postgres"))]
impl DatabaseConnections {
    pub async fn ping(&self) -> bool {
        false
    }
}

impl DatabaseConnections {
    /// List all available secondary database names.
    pub fn secondary_names(&self) -> Vec<&str> {
        self.secondary.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Iterator<Item = (String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_parse_secondary_databases() {
        let parsed = parse_secondary_databases(vars(&[
            ("SECONDARY_DB_ANALYTICS", "postgres://a/analytics,5"),
            ("SECONDARY_DB_ARCHIVE", "postgres://a/archive"),
            ("DATABASE_URL", "postgres://a/main"),
            ("SECONDARY_DB_EMPTY", ""),
        ]));

        assert_eq!(
            parsed,
            vec![
                SecondaryDbConfig {
                    name: "analytics".to_string(),
                    url: "postgres://a/analytics".to_string(),
                    max_connections: 5,
                },
                SecondaryDbConfig {
                    name: "archive".to_string(),
                    url: "postgres://a/archive".to_string(),
                    max_connections: 20,
                },
            ]
        );
    }
}
