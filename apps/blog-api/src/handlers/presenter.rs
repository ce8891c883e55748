//! Domain read models to JSON bodies.

use blog_core::PostService;
use blog_core::domain::{
    Comment, DEFAULT_WORDS_PER_MINUTE, Page, PostDetails, ReadTime, Tag, User,
};
use blog_shared::{
    CommentResponse, PaginatedPosts, PaginationMeta, PostResponse, TagResponse, UserResponse,
};

/// How much of a post an endpoint renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Listing cards: identity, counters, author and cover.
    Card,
    /// Card plus body, description and read time.
    Teaser,
    /// Every column and every loaded relation.
    Full,
}

pub fn present(service: &PostService, details: PostDetails, projection: Projection) -> PostResponse {
    let PostDetails {
        post,
        author,
        cover,
        tags,
        total_comments,
        comments,
    } = details;

    let full = projection == Projection::Full;
    let teaser = full || projection == Projection::Teaser;

    PostResponse {
        id: post.id,
        duration: teaser.then(|| ReadTime::estimate(&post.content, DEFAULT_WORDS_PER_MINUTE).to_string()),
        title: post.title,
        slug: post.slug,
        publish: full.then(|| post.publish.to_string()),
        featured: full.then_some(post.featured),
        content: teaser.then_some(post.content),
        author_id: post.author_id,
        description: if teaser { post.description } else { None },
        total_views: post.counters.views,
        total_shares: post.counters.shares,
        total_favorites: full.then_some(post.counters.favorites),
        meta_title: if full { post.meta.title } else { None },
        meta_keywords: full.then_some(post.meta.keywords),
        meta_description: if full { post.meta.description } else { None },
        created_at: post.created_at,
        updated_at: full.then_some(post.updated_at),
        deleted_at: if full { post.lifecycle.deleted_at() } else { None },
        comments: if full {
            comments.map(|comments| comments.into_iter().map(comment).collect())
        } else {
            None
        },
        total_comments: Some(total_comments),
        cover_url: cover.map(|cover| service.cover_url(&cover)),
        author: author.map(user),
        tags: full.then(|| tags.into_iter().map(tag).collect()),
    }
}

pub fn present_all(
    service: &PostService,
    posts: Vec<PostDetails>,
    projection: Projection,
) -> Vec<PostResponse> {
    posts
        .into_iter()
        .map(|details| present(service, details, projection))
        .collect()
}

pub fn paginate(
    service: &PostService,
    page: Page<PostDetails>,
    projection: Projection,
) -> PaginatedPosts {
    let meta = PaginationMeta {
        current_page: page.page,
        per_page: page.per_page,
        total: page.total,
        last_page: page.last_page(),
    };

    PaginatedPosts {
        data: present_all(service, page.items, projection),
        meta,
    }
}

pub fn tag(tag: Tag) -> TagResponse {
    TagResponse {
        id: tag.id,
        name: tag.name,
        slug: tag.slug,
    }
}

fn user(user: User) -> UserResponse {
    UserResponse {
        id: user.id,
        name: user.name,
        created_at: user.created_at,
    }
}

fn comment(comment: Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        parent_id: comment.parent_id,
        author_id: comment.author_id,
        body: comment.body,
        created_at: comment.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use blog_core::PostSettings;
    use blog_core::domain::{CoverImage, Post, PostDraft};
    use blog_infra::{InMemoryCache, InMemoryPostRepository, InMemoryStorage};
    use uuid::Uuid;

    fn service() -> PostService {
        PostService::new(
            Arc::new(InMemoryPostRepository::new()),
            Arc::new(InMemoryCache::new()),
            Arc::new(InMemoryStorage::new()),
            PostSettings::default(),
        )
    }

    fn details() -> PostDetails {
        let post = Post::new(
            Uuid::new_v4(),
            "hello-world".to_string(),
            PostDraft {
                title: "Hello world".to_string(),
                content: "word ".repeat(450),
                description: Some("Intro".to_string()),
                ..Default::default()
            },
        );
        PostDetails {
            cover: Some(CoverImage::new(post.id, "uploads/post/cover/a.png".to_string())),
            post,
            author: None,
            tags: vec![Tag::new("Rust")],
            total_comments: 2,
            comments: Some(vec![]),
        }
    }

    #[test]
    fn test_card_leaves_columns_null_and_relations_out() {
        let service = service();
        let json = serde_json::to_value(present(&service, details(), Projection::Card)).unwrap();

        assert_eq!(json["slug"], "hello-world");
        assert!(json["content"].is_null());
        assert!(json["duration"].is_null());
        assert_eq!(json["totalComments"], 2);
        assert_eq!(json["coverUrl"], "/storage/uploads/post/cover/a.png");
        assert!(json.get("tags").is_none());
        assert!(json.get("comments").is_none());
    }

    #[test]
    fn test_teaser_adds_body_and_read_time() {
        let service = service();
        let json = serde_json::to_value(present(&service, details(), Projection::Teaser)).unwrap();

        assert_eq!(json["duration"], "3 min read");
        assert_eq!(json["description"], "Intro");
        assert!(json["publish"].is_null());
    }

    #[test]
    fn test_full_renders_everything() {
        let service = service();
        let json = serde_json::to_value(present(&service, details(), Projection::Full)).unwrap();

        assert_eq!(json["publish"], "draft");
        assert_eq!(json["tags"][0]["slug"], "rust");
        assert_eq!(json["comments"], serde_json::json!([]));
        assert!(json["deletedAt"].is_null());
    }
}
