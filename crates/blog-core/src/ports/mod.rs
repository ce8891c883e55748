//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod image;
mod repository;
mod storage;

pub use auth::{AuthError, TokenClaims, TokenService};
pub use cache::{Cache, CacheError};
pub use image::{ImageError, ImageProcessor};
pub use repository::{PostRepository, PostTransaction};
pub use storage::{BlobStorage, StorageError};
