//! # Blog Shared
//!
//! The JSON contract of the posts API: response bodies and envelopes.
//! Kept free of domain types so clients can depend on it alone.

pub mod dto;
pub mod response;

pub use dto::{
    CommentResponse, PaginatedPosts, PaginationMeta, PostResponse, TagResponse, UserResponse,
};
pub use response::{ErrorResponse, MessageResponse};
