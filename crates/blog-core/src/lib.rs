//! # Blog Core
//!
//! The domain layer of the blog service.
//! Post lifecycle, cover planning, authorization rules and the `PostService`
//! live here; persistence, caching and storage are reached through ports only.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::DomainError;
pub use services::{PostAttachments, PostService, PostSettings};
