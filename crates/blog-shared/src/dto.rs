//! Data Transfer Objects - the post JSON contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A post as rendered to clients.
///
/// Column fields are always present and `null` when the endpoint does not
/// project them. Relation fields are omitted unless loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub publish: Option<String>,
    pub featured: Option<bool>,
    pub content: Option<String>,
    pub author_id: Uuid,
    pub description: Option<String>,
    /// Estimated read time, e.g. `"4 min read"`.
    pub duration: Option<String>,
    pub total_views: u64,
    pub total_shares: u64,
    pub total_favorites: Option<u64>,
    pub meta_title: Option<String>,
    pub meta_keywords: Option<Vec<String>>,
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResponse>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_comments: Option<u64>,
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagResponse>>,
}

/// Public author information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
}

/// A page of posts: `{ data, meta }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedPosts {
    pub data: Vec<PostResponse>,
    pub meta: PaginationMeta,
}
