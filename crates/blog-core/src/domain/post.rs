use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Publication state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    #[default]
    Draft,
    Published,
}

impl PublishState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishState::Draft => "draft",
            PublishState::Published => "published",
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PublishState::Draft),
            "published" => Ok(PublishState::Published),
            other => Err(DomainError::Validation(format!(
                "unknown publish state `{other}`"
            ))),
        }
    }
}

/// Where a post sits in its lifecycle.
///
/// `Purged` is terminal and never read back from storage; it only exists on
/// the in-flight value after a force delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    SoftDeleted { at: DateTime<Utc> },
    Purged,
}

impl Lifecycle {
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(at) => Lifecycle::SoftDeleted { at },
            None => Lifecycle::Active,
        }
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::SoftDeleted { at } => Some(*at),
            _ => None,
        }
    }
}

/// SEO metadata attached to a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMeta {
    pub title: Option<String>,
    pub keywords: Vec<String>,
    pub description: Option<String>,
}

/// Engagement counters. Unsigned so they can never go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCounters {
    pub views: u64,
    pub shares: u64,
    pub favorites: u64,
}

/// Post entity - a blog article owned by its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub description: Option<String>,
    pub publish: PublishState,
    pub featured: bool,
    pub counters: PostCounters,
    pub meta: PostMeta,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when writing a post.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub publish: PublishState,
    pub featured: bool,
    pub meta: PostMeta,
}

/// Partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub publish: Option<PublishState>,
    pub featured: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_keywords: Option<Vec<String>>,
    pub meta_description: Option<String>,
}

impl Post {
    /// Create a new active post with zeroed counters.
    pub fn new(author_id: Uuid, slug: String, draft: PostDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            title: draft.title,
            slug,
            content: draft.content,
            description: draft.description,
            publish: draft.publish,
            featured: draft.featured,
            counters: PostCounters::default(),
            meta: draft.meta,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_published(&self) -> bool {
        self.publish == PublishState::Published
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// Returns true when `title` would change the current title.
    pub fn title_changes(&self, title: Option<&str>) -> bool {
        title.is_some_and(|t| t != self.title)
    }

    /// Apply a partial update. The slug is handled separately by the caller.
    pub fn apply(&mut self, changes: PostChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(description) = changes.description {
            self.description = Some(description);
        }
        if let Some(publish) = changes.publish {
            self.publish = publish;
        }
        if let Some(featured) = changes.featured {
            self.featured = featured;
        }
        if let Some(title) = changes.meta_title {
            self.meta.title = Some(title);
        }
        if let Some(keywords) = changes.meta_keywords {
            self.meta.keywords = keywords;
        }
        if let Some(description) = changes.meta_description {
            self.meta.description = Some(description);
        }
        self.updated_at = Utc::now();
    }

    /// Active -> SoftDeleted.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        match self.lifecycle {
            Lifecycle::Active => {
                self.lifecycle = Lifecycle::SoftDeleted { at };
                Ok(())
            }
            Lifecycle::SoftDeleted { .. } => Err(DomainError::InvalidTransition(format!(
                "post {} is already deleted",
                self.id
            ))),
            Lifecycle::Purged => Err(purged(self.id)),
        }
    }

    /// SoftDeleted -> Active.
    pub fn restore(&mut self) -> Result<(), DomainError> {
        match self.lifecycle {
            Lifecycle::SoftDeleted { .. } => {
                self.lifecycle = Lifecycle::Active;
                self.updated_at = Utc::now();
                Ok(())
            }
            Lifecycle::Active => Err(DomainError::InvalidTransition(format!(
                "post {} is not deleted",
                self.id
            ))),
            Lifecycle::Purged => Err(purged(self.id)),
        }
    }

    /// Active | SoftDeleted -> Purged.
    pub fn purge(&mut self) -> Result<(), DomainError> {
        match self.lifecycle {
            Lifecycle::Purged => Err(purged(self.id)),
            _ => {
                self.lifecycle = Lifecycle::Purged;
                Ok(())
            }
        }
    }
}

fn purged(id: Uuid) -> DomainError {
    DomainError::InvalidTransition(format!("post {id} has been purged"))
}
