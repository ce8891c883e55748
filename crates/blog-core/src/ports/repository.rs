use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{CoverImage, Page, Post, PostDetails, PostQuery, Tag, Visibility};
use crate::error::RepoError;

/// Post repository - reads plus a handle for transactional writes.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Find a post by id within the given visibility scope.
    async fn find(&self, id: Uuid, visibility: Visibility) -> Result<Option<Post>, RepoError>;

    /// Find a published, non-deleted post by slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError>;

    /// Whether any stored row (soft-deleted included) uses `slug`,
    /// ignoring the post `except`.
    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> Result<bool, RepoError>;

    /// Current cover of a post.
    async fn cover(&self, post_id: Uuid) -> Result<Option<CoverImage>, RepoError>;

    /// Load author, cover, tags and top-level comments for a single post.
    async fn load_details(&self, post: Post) -> Result<PostDetails, RepoError>;

    /// Paginated listing with relations and top-level comment counts.
    async fn list(&self, query: &PostQuery) -> Result<Page<PostDetails>, RepoError>;

    /// Published posts flagged as featured, newest first.
    async fn featured(&self, limit: u64) -> Result<Vec<PostDetails>, RepoError>;

    /// Most recently created published posts.
    async fn latest(&self, limit: u64) -> Result<Vec<PostDetails>, RepoError>;

    /// Case-insensitive partial title match over published posts.
    async fn search(&self, term: &str) -> Result<Vec<PostDetails>, RepoError>;

    /// All tags, alphabetically.
    async fn tags(&self) -> Result<Vec<Tag>, RepoError>;

    /// Open a write transaction.
    async fn begin(&self) -> Result<Box<dyn PostTransaction>, RepoError>;
}

/// Unit of work over posts and their dependent rows.
///
/// Nothing staged here is visible to readers until [`PostTransaction::commit`].
/// Dropping the transaction without committing discards it.
#[async_trait]
pub trait PostTransaction: Send {
    async fn insert_post(&mut self, post: &Post) -> Result<(), RepoError>;

    async fn update_post(&mut self, post: &Post) -> Result<(), RepoError>;

    /// Create or replace the cover record of a post.
    async fn save_cover(&mut self, post_id: Uuid, path: &str) -> Result<(), RepoError>;

    async fn delete_cover(&mut self, post_id: Uuid) -> Result<(), RepoError>;

    /// Replace the tag set of a post, creating unknown tags.
    async fn sync_tags(&mut self, post_id: Uuid, names: &[String]) -> Result<(), RepoError>;

    async fn soft_delete(&mut self, post_id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError>;

    async fn restore(&mut self, post_id: Uuid) -> Result<(), RepoError>;

    /// Remove the post row and its dependent rows for good.
    async fn purge(&mut self, post_id: Uuid) -> Result<(), RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;

    async fn rollback(self: Box<Self>) -> Result<(), RepoError>;
}
