//! In-memory post repository - used when no database is configured and in tests.
//!
//! Writes are staged on the transaction and replayed against a copy of the
//! store on commit, so a failing operation leaves nothing behind.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use blog_core::domain::{
    Comment, CoverImage, Lifecycle, Page, Post, PostDetails, PostQuery, SortOrder, Tag, User,
    Visibility,
};
use blog_core::error::RepoError;
use blog_core::ports::{PostRepository, PostTransaction};

#[derive(Debug, Clone, Default)]
struct Store {
    posts: HashMap<Uuid, Post>,
    users: HashMap<Uuid, User>,
    covers: HashMap<Uuid, CoverImage>,
    tags: Vec<Tag>,
    /// post id -> tag ids in author order
    taggables: HashMap<Uuid, Vec<Uuid>>,
    comments: Vec<Comment>,
}

impl Store {
    fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.posts
            .values()
            .any(|p| p.slug == slug && Some(p.id) != except)
    }

    fn details(&self, post: Post, with_comments: bool) -> PostDetails {
        let top_level: Vec<&Comment> = self
            .comments
            .iter()
            .filter(|c| c.post_id == post.id && c.is_top_level())
            .collect();

        let comments = with_comments.then(|| {
            let mut comments: Vec<Comment> = top_level.iter().map(|c| (*c).clone()).collect();
            comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            comments
        });

        let tags = self
            .taggables
            .get(&post.id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.tags.iter().find(|t| t.id == *id).cloned())
                    .collect()
            })
            .unwrap_or_default();

        PostDetails {
            author: self.users.get(&post.author_id).cloned(),
            cover: self.covers.get(&post.id).cloned(),
            tags,
            total_comments: top_level.len() as u64,
            comments,
            post,
        }
    }

    /// Published, live posts, newest first.
    fn published(&self) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .values()
            .filter(|p| Visibility::Public.admits(p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }

    fn apply(&mut self, op: Op) -> Result<(), RepoError> {
        match op {
            Op::InsertPost(post) => {
                if self.posts.contains_key(&post.id) {
                    return Err(RepoError::Constraint("posts_pkey".to_string()));
                }
                if self.slug_taken(&post.slug, None) {
                    return Err(RepoError::Constraint("posts_slug_key".to_string()));
                }
                self.posts.insert(post.id, post);
            }
            Op::UpdatePost(post) => {
                if !self.posts.contains_key(&post.id) {
                    return Err(RepoError::NotFound);
                }
                if self.slug_taken(&post.slug, Some(post.id)) {
                    return Err(RepoError::Constraint("posts_slug_key".to_string()));
                }
                self.posts.insert(post.id, post);
            }
            Op::SaveCover { post_id, path } => match self.covers.get_mut(&post_id) {
                Some(cover) => {
                    cover.path = path;
                    cover.updated_at = Utc::now();
                }
                None => {
                    self.covers.insert(post_id, CoverImage::new(post_id, path));
                }
            },
            Op::DeleteCover(post_id) => {
                self.covers.remove(&post_id);
            }
            Op::SyncTags { post_id, names } => {
                let mut ids = Vec::with_capacity(names.len());
                for name in names {
                    let id = match self.tags.iter().find(|t| t.name == name) {
                        Some(tag) => tag.id,
                        None => {
                            let tag = Tag::new(&name);
                            let id = tag.id;
                            self.tags.push(tag);
                            id
                        }
                    };
                    ids.push(id);
                }
                self.taggables.insert(post_id, ids);
            }
            Op::SoftDelete { post_id, at } => {
                let post = self.posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;
                post.lifecycle = Lifecycle::SoftDeleted { at };
                post.updated_at = at;
            }
            Op::Restore(post_id) => {
                let post = self.posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;
                post.lifecycle = Lifecycle::Active;
                post.updated_at = Utc::now();
            }
            Op::Purge(post_id) => {
                self.posts.remove(&post_id).ok_or(RepoError::NotFound)?;
                self.covers.remove(&post_id);
                self.taggables.remove(&post_id);
                self.comments.retain(|c| c.post_id != post_id);
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Op {
    InsertPost(Post),
    UpdatePost(Post),
    SaveCover { post_id: Uuid, path: String },
    DeleteCover(Uuid),
    SyncTags { post_id: Uuid, names: Vec<String> },
    SoftDelete { post_id: Uuid, at: DateTime<Utc> },
    Restore(Uuid),
    Purge(Uuid),
}

/// In-memory post repository. Clones share the same store.
#[derive(Clone, Default)]
pub struct InMemoryPostRepository {
    store: Arc<RwLock<Store>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an author so listings can render them.
    pub async fn insert_user(&self, user: User) {
        self.store.write().await.users.insert(user.id, user);
    }

    pub async fn insert_comment(&self, comment: Comment) {
        self.store.write().await.comments.push(comment);
    }

    /// Make the next commit fail with a connection error.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find(&self, id: Uuid, visibility: Visibility) -> Result<Option<Post>, RepoError> {
        let store = self.store.read().await;
        Ok(store
            .posts
            .get(&id)
            .filter(|p| visibility.admits(p))
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let store = self.store.read().await;
        Ok(store
            .posts
            .values()
            .find(|p| p.slug == slug && Visibility::Public.admits(p))
            .cloned())
    }

    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> Result<bool, RepoError> {
        Ok(self.store.read().await.slug_taken(slug, except))
    }

    async fn cover(&self, post_id: Uuid) -> Result<Option<CoverImage>, RepoError> {
        Ok(self.store.read().await.covers.get(&post_id).cloned())
    }

    async fn load_details(&self, post: Post) -> Result<PostDetails, RepoError> {
        let store = self.store.read().await;
        // Reload so the caller sees committed state
        let post = store.posts.get(&post.id).cloned().unwrap_or(post);
        Ok(store.details(post, true))
    }

    async fn list(&self, query: &PostQuery) -> Result<Page<PostDetails>, RepoError> {
        let store = self.store.read().await;

        let mut posts: Vec<Post> = store
            .posts
            .values()
            .filter(|p| query.visibility.admits(p))
            .filter(|p| query.publish.is_none_or(|state| p.publish == state))
            .cloned()
            .collect();
        match query.sort {
            SortOrder::NewestFirst => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::OldestFirst => posts.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }

        let total = posts.len() as u64;
        let items = posts
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .map(|post| store.details(post, false))
            .collect();

        Ok(Page {
            items,
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }

    async fn featured(&self, limit: u64) -> Result<Vec<PostDetails>, RepoError> {
        let store = self.store.read().await;
        Ok(store
            .published()
            .into_iter()
            .filter(|p| p.featured)
            .take(limit as usize)
            .map(|post| store.details(post, false))
            .collect())
    }

    async fn latest(&self, limit: u64) -> Result<Vec<PostDetails>, RepoError> {
        let store = self.store.read().await;
        Ok(store
            .published()
            .into_iter()
            .take(limit as usize)
            .map(|post| store.details(post, false))
            .collect())
    }

    async fn search(&self, term: &str) -> Result<Vec<PostDetails>, RepoError> {
        let store = self.store.read().await;
        let needle = term.to_lowercase();
        Ok(store
            .published()
            .into_iter()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .map(|post| store.details(post, false))
            .collect())
    }

    async fn tags(&self) -> Result<Vec<Tag>, RepoError> {
        let mut tags = self.store.read().await.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn begin(&self) -> Result<Box<dyn PostTransaction>, RepoError> {
        Ok(Box::new(InMemoryTransaction {
            store: Arc::clone(&self.store),
            fail_commit: Arc::clone(&self.fail_next_commit),
            ops: Vec::new(),
        }))
    }
}

/// Staged writes against an [`InMemoryPostRepository`].
pub struct InMemoryTransaction {
    store: Arc<RwLock<Store>>,
    fail_commit: Arc<AtomicBool>,
    ops: Vec<Op>,
}

#[async_trait]
impl PostTransaction for InMemoryTransaction {
    async fn insert_post(&mut self, post: &Post) -> Result<(), RepoError> {
        self.ops.push(Op::InsertPost(post.clone()));
        Ok(())
    }

    async fn update_post(&mut self, post: &Post) -> Result<(), RepoError> {
        self.ops.push(Op::UpdatePost(post.clone()));
        Ok(())
    }

    async fn save_cover(&mut self, post_id: Uuid, path: &str) -> Result<(), RepoError> {
        self.ops.push(Op::SaveCover {
            post_id,
            path: path.to_string(),
        });
        Ok(())
    }

    async fn delete_cover(&mut self, post_id: Uuid) -> Result<(), RepoError> {
        self.ops.push(Op::DeleteCover(post_id));
        Ok(())
    }

    async fn sync_tags(&mut self, post_id: Uuid, names: &[String]) -> Result<(), RepoError> {
        self.ops.push(Op::SyncTags {
            post_id,
            names: names.to_vec(),
        });
        Ok(())
    }

    async fn soft_delete(&mut self, post_id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError> {
        self.ops.push(Op::SoftDelete { post_id, at });
        Ok(())
    }

    async fn restore(&mut self, post_id: Uuid) -> Result<(), RepoError> {
        self.ops.push(Op::Restore(post_id));
        Ok(())
    }

    async fn purge(&mut self, post_id: Uuid) -> Result<(), RepoError> {
        self.ops.push(Op::Purge(post_id));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(RepoError::Connection("commit failed".to_string()));
        }

        let mut store = self.store.write().await;
        let mut next = store.clone();
        for op in self.ops {
            next.apply(op)?;
        }
        *store = next;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        Ok(())
    }
}
