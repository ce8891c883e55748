//! SeaORM entities for the blog schema.

pub mod comment;
pub mod image;
pub mod post;
pub mod tag;
pub mod taggable;
pub mod user;
