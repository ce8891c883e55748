//! Query composition and read models for post listings.

use serde::{Deserialize, Serialize};

use super::{Comment, CoverImage, Post, PublishState, Tag, User};

pub const PAGE_SIZE: u64 = 10;
pub const HIGHLIGHT_LIMIT: u64 = 5;

/// Which rows a query may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Published and not soft-deleted.
    Public,
    /// Everything still in storage, soft-deleted rows included.
    WithTrashed,
}

impl Visibility {
    pub fn admits(&self, post: &Post) -> bool {
        match self {
            Visibility::Public => post.is_published() && post.lifecycle.deleted_at().is_none(),
            Visibility::WithTrashed => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl SortOrder {
    /// Parse the `sort` query parameter (`created_at` / `-created_at`).
    pub fn from_param(param: Option<&str>) -> Option<Self> {
        match param {
            None | Some("") => Some(SortOrder::default()),
            Some("created_at") => Some(SortOrder::OldestFirst),
            Some("-created_at") => Some(SortOrder::NewestFirst),
            Some(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::NewestFirst => "desc",
            SortOrder::OldestFirst => "asc",
        }
    }
}

/// A paginated listing request, already resolved to a visibility scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub visibility: Visibility,
    pub publish: Option<PublishState>,
    pub sort: SortOrder,
    pub page: u64,
    pub per_page: u64,
}

impl PostQuery {
    pub fn public(page: u64) -> Self {
        Self {
            visibility: Visibility::Public,
            publish: None,
            sort: SortOrder::NewestFirst,
            page: page.max(1),
            per_page: PAGE_SIZE,
        }
    }

    pub fn admin(page: u64, publish: Option<PublishState>, sort: SortOrder) -> Self {
        Self {
            visibility: Visibility::WithTrashed,
            publish,
            sort,
            page: page.max(1),
            per_page: PAGE_SIZE,
        }
    }

    /// Zero-based page offset.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }
}

/// One page of results plus the numbers needed for pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn last_page(&self) -> u64 {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }
}

/// A post with its relations loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetails {
    pub post: Post,
    pub author: Option<User>,
    pub cover: Option<CoverImage>,
    pub tags: Vec<Tag>,
    /// Number of top-level comments.
    pub total_comments: u64,
    /// Top-level comments, only loaded for single-post reads.
    pub comments: Option<Vec<Comment>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_param() {
        assert_eq!(SortOrder::from_param(None), Some(SortOrder::NewestFirst));
        assert_eq!(
            SortOrder::from_param(Some("created_at")),
            Some(SortOrder::OldestFirst)
        );
        assert_eq!(SortOrder::from_param(Some("title")), None);
    }

    #[test]
    fn test_page_numbers() {
        let page: Page<()> = Page {
            items: vec![],
            page: 1,
            per_page: 10,
            total: 21,
        };
        assert_eq!(page.last_page(), 3);
        assert_eq!(PostQuery::public(0).page, 1);
        assert_eq!(PostQuery::public(3).offset(), 20);
    }
}
