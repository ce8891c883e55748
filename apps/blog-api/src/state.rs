//! Application state - shared across all handlers.

use std::sync::Arc;

use blog_core::ports::{BlobStorage, Cache, CacheError, PostRepository, TokenService};
use blog_core::PostService;
use blog_infra::{
    DatabaseConnections, InMemoryCache, InMemoryPostRepository, InMemoryStorage, JwtTokenService,
    LocalDiskStorage,
};

#[cfg(feature = "postgres")]
use blog_infra::database::PostgresPostRepository;

#[cfg(feature = "redis")]
use blog_infra::RedisCache;

use crate::config::{AppConfig, UploadConfig};

/// Failures that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("cache unavailable: {0}")]
    Cache(#[from] CacheError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub tokens: Arc<dyn TokenService>,
    pub db: Option<Arc<DatabaseConnections>>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Result<Self, StartupError> {
        let cache = init_cache(config).await?;
        let storage = init_storage(&config.uploads);
        let (db, repo) = init_repository(config).await;

        let posts = PostService::new(repo, cache, storage, config.posts.clone());

        #[cfg(feature = "imaging")]
        let posts = posts.with_image_processor(Arc::new(blog_infra::RasterImageProcessor::new()));

        tracing::info!(database = db.is_some(), "Application state initialized");

        Ok(Self {
            posts: Arc::new(posts),
            tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
            db,
        })
    }

    /// Fully in-memory state.
    #[cfg(test)]
    pub fn in_memory(
        repo: InMemoryPostRepository,
        settings: blog_core::PostSettings,
        jwt: blog_infra::JwtConfig,
    ) -> Self {
        let posts = PostService::new(
            Arc::new(repo),
            Arc::new(InMemoryCache::new()),
            Arc::new(InMemoryStorage::new()),
            settings,
        );

        Self {
            posts: Arc::new(posts),
            tokens: Arc::new(JwtTokenService::new(jwt)),
            db: None,
        }
    }
}

#[cfg(feature = "redis")]
async fn init_cache(config: &AppConfig) -> Result<Arc<dyn Cache>, StartupError> {
    let Some(redis) = config.redis.clone() else {
        tracing::info!("REDIS_URL not set. Using in-memory cache.");
        return Ok(Arc::new(InMemoryCache::new()));
    };

    let fallback = redis.fallback_to_memory;
    match RedisCache::new(redis).await {
        Ok(cache) => Ok(Arc::new(cache)),
        Err(e) if fallback => {
            tracing::warn!(error = %e, "Redis unavailable. Falling back to in-memory cache.");
            Ok(Arc::new(InMemoryCache::new()))
        }
        Err(e) => {
            tracing::error!(error = %e, "Redis unavailable and fallback disabled");
            Err(e.into())
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn init_cache(_config: &AppConfig) -> Result<Arc<dyn Cache>, StartupError> {
    Ok(Arc::new(InMemoryCache::new()))
}

fn init_storage(uploads: &UploadConfig) -> Arc<dyn BlobStorage> {
    match LocalDiskStorage::new(&uploads.root, uploads.public_url.clone()) {
        Ok(storage) => {
            tracing::info!(root = %uploads.root.display(), "Cover uploads on local disk");
            Arc::new(storage)
        }
        Err(e) => {
            tracing::error!(
                root = %uploads.root.display(),
                error = %e,
                "Upload directory unusable. Keeping covers in memory."
            );
            Arc::new(InMemoryStorage::with_public_url(uploads.public_url.clone()))
        }
    }
}

#[cfg(feature = "postgres")]
async fn init_repository(
    config: &AppConfig,
) -> (Option<Arc<DatabaseConnections>>, Arc<dyn PostRepository>) {
    let Some(db_config) = config.database.as_ref() else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return (None, Arc::new(InMemoryPostRepository::new()));
    };

    match DatabaseConnections::init(db_config).await {
        Ok(connections) => {
            let conn = Arc::new(connections);
            let repo = Arc::new(PostgresPostRepository::new(conn.main.clone()));
            (Some(conn), repo)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database. Using in-memory fallback.");
            (None, Arc::new(InMemoryPostRepository::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn init_repository(
    _config: &AppConfig,
) -> (Option<Arc<DatabaseConnections>>, Arc<dyn PostRepository>) {
    tracing::info!("Running without postgres feature - using in-memory repository");
    (None, Arc::new(InMemoryPostRepository::new()))
}
