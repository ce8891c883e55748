//! # Blog Infrastructure
//!
//! Concrete implementations of the ports defined in `blog-core`.
//! This crate contains database, cache, blob storage and image integrations.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL database support via SeaORM
//! - `auth` - JWT token validation
//! - `redis` - Redis cache
//! - `imaging` - Cover downscaling via the `image` crate

pub mod cache;
pub mod database;
pub mod storage;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "imaging")]
pub mod imaging;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use database::{DatabaseConnections, InMemoryPostRepository};
pub use storage::{InMemoryStorage, LocalDiskStorage};

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};

#[cfg(feature = "imaging")]
pub use imaging::RasterImageProcessor;

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
