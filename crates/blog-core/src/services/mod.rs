//! Application services orchestrating domain rules over the ports.

pub mod cache;
mod posts;

pub use posts::{PostAttachments, PostService, PostSettings};
