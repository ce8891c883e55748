//! Database connection management and post repositories.

mod connections;
mod memory;

#[cfg(feature = "postgres")]
pub mod entity;
#[cfg(feature = "postgres")]
mod postgres_repo;

pub use connections::{DatabaseConfig, DatabaseConnections, NamedConnection, SecondaryDbConfig};
pub use memory::{InMemoryPostRepository, InMemoryTransaction};

#[cfg(feature = "postgres")]
pub use postgres_repo::{PostgresPostRepository, SeaPostTransaction};
