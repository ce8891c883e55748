//! `PostService` - every post operation, shared by the public and dashboard
//! handlers.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::cache::{FEATURED_POSTS, LATEST_POSTS, PostCache};
use crate::domain::policy::{self, Actor, PostAction};
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug};
use crate::domain::{
    COVER_UPLOAD_DIR, CoverImage, CoverInput, CoverPlan, CoverSource, CoverUpload,
    HIGHLIGHT_LIMIT, Page, Post, PostChanges, PostDetails, PostDraft, PostQuery, Tag,
    Visibility, normalize_tag_names, plan_cover,
};
use crate::error::DomainError;
use crate::ports::{
    BlobStorage, Cache, ImageError, ImageProcessor, PostRepository, PostTransaction,
};

/// Tunables of the post service.
#[derive(Debug, Clone)]
pub struct PostSettings {
    pub cache_ttl: Duration,
    pub cover_max_height: u32,
    pub cover_quality: u8,
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60 * 60),
            cover_max_height: 300,
            cover_quality: 75,
        }
    }
}

/// Side data written together with a post.
#[derive(Debug, Clone, Default)]
pub struct PostAttachments {
    /// Replaces the tag set; empty clears it.
    pub tags: Vec<String>,
    pub cover: CoverInput,
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    cache: PostCache,
    storage: Arc<dyn BlobStorage>,
    images: Option<Arc<dyn ImageProcessor>>,
    settings: PostSettings,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        cache: Arc<dyn Cache>,
        storage: Arc<dyn BlobStorage>,
        settings: PostSettings,
    ) -> Self {
        Self {
            repo,
            cache: PostCache::new(cache, settings.cache_ttl),
            storage,
            images: None,
            settings,
        }
    }

    /// Downscale uploaded covers with `processor` before storing them.
    pub fn with_image_processor(mut self, processor: Arc<dyn ImageProcessor>) -> Self {
        self.images = Some(processor);
        self
    }

    /// Public URL of a cover path.
    pub fn cover_url(&self, cover: &CoverImage) -> String {
        if cover.is_stored_locally() {
            self.storage.url(&cover.path)
        } else {
            cover.path.clone()
        }
    }

    // ----- reads -----

    pub async fn list_public(&self, page: u64) -> Result<Page<PostDetails>, DomainError> {
        let query = PostQuery::public(page);
        let key = self.cache.key_for(&query).await;
        self.cache.remember(&key, || self.repo.list(&query)).await
    }

    pub async fn list_admin(
        &self,
        actor: &Actor,
        query: PostQuery,
    ) -> Result<Page<PostDetails>, DomainError> {
        policy::authorize(actor, PostAction::ViewAny)?;
        let key = self.cache.key_for(&query).await;
        self.cache.remember(&key, || self.repo.list(&query)).await
    }

    pub async fn show_public(&self, slug: &str) -> Result<PostDetails, DomainError> {
        let post = self
            .repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::post_not_found(slug))?;
        self.cached_details(post).await
    }

    pub async fn show(&self, actor: &Actor, id: Uuid) -> Result<PostDetails, DomainError> {
        let post = self.find_stored(id).await?;
        policy::authorize(actor, PostAction::View(&post))?;
        self.cached_details(post).await
    }

    pub async fn featured(&self) -> Result<Vec<PostDetails>, DomainError> {
        self.cache
            .remember(FEATURED_POSTS, || self.repo.featured(HIGHLIGHT_LIMIT))
            .await
    }

    pub async fn latest(&self) -> Result<Vec<PostDetails>, DomainError> {
        self.cache
            .remember(LATEST_POSTS, || self.repo.latest(HIGHLIGHT_LIMIT))
            .await
    }

    pub async fn search(&self, term: &str) -> Result<Vec<PostDetails>, DomainError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repo.search(term).await?)
    }

    pub async fn tags(&self) -> Result<Vec<Tag>, DomainError> {
        Ok(self.repo.tags().await?)
    }

    // ----- writes -----

    pub async fn create(
        &self,
        actor: &Actor,
        draft: PostDraft,
        attachments: PostAttachments,
    ) -> Result<PostDetails, DomainError> {
        policy::authorize(actor, PostAction::Create)?;

        let slug = self.unique_slug(&draft.title, None).await?;
        let post = Post::new(actor.user_id, slug, draft);

        let mut tx = self.repo.begin().await?;
        let staged = self.stage_create(tx.as_mut(), &post, &attachments).await;
        self.finish(tx, staged).await?;

        tracing::info!(post_id = %post.id, user_id = %actor.user_id, slug = %post.slug, "Post created");
        self.cache.invalidate_post(post.id).await;

        Ok(self.repo.load_details(post).await?)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: PostChanges,
        attachments: PostAttachments,
    ) -> Result<PostDetails, DomainError> {
        let mut post = self.find_stored(id).await?;
        policy::authorize(actor, PostAction::Update(&post))?;

        let retitled = post.title_changes(changes.title.as_deref());
        post.apply(changes);
        if retitled {
            post.slug = self.unique_slug(&post.title, Some(post.id)).await?;
        }

        let existing = self.repo.cover(id).await?;
        let mut tx = self.repo.begin().await?;
        let staged = self
            .stage_update(tx.as_mut(), &post, existing.as_ref(), &attachments)
            .await;
        self.finish(tx, staged).await?;

        tracing::info!(post_id = %id, user_id = %actor.user_id, "Post updated");
        self.cache.invalidate_post(id).await;

        Ok(self.repo.load_details(post).await?)
    }

    /// Soft delete. The cover file and record go away immediately.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), DomainError> {
        let mut post = self.find_stored(id).await?;
        policy::authorize(actor, PostAction::Delete(&post))?;

        let at = Utc::now();
        post.soft_delete(at)?;

        let cover = self.repo.cover(id).await?;
        let mut tx = self.repo.begin().await?;
        let detached = self.detach_cover(tx.as_mut(), cover.as_ref()).await;
        let staged = match detached {
            Ok(()) => tx.soft_delete(id, at).await.map_err(DomainError::from),
            Err(e) => Err(e),
        };
        self.finish(tx, staged.map(|_| None)).await?;

        tracing::info!(post_id = %id, user_id = %actor.user_id, "Post soft-deleted");
        self.cache.invalidate_post(id).await;
        Ok(())
    }

    pub async fn restore(&self, actor: &Actor, id: Uuid) -> Result<PostDetails, DomainError> {
        let mut post = self.find_stored(id).await?;
        policy::authorize(actor, PostAction::Restore(&post))?;
        post.restore()?;

        let mut tx = self.repo.begin().await?;
        let staged = tx.restore(id).await.map_err(DomainError::from);
        self.finish(tx, staged.map(|_| None)).await?;

        tracing::info!(post_id = %id, user_id = %actor.user_id, "Post restored");
        self.cache.invalidate_post(id).await;

        Ok(self.repo.load_details(post).await?)
    }

    /// Permanent removal of the post, its cover file and dependent rows.
    pub async fn force_delete(&self, actor: &Actor, id: Uuid) -> Result<(), DomainError> {
        let mut post = self.find_stored(id).await?;
        policy::authorize(actor, PostAction::ForceDelete(&post))?;
        post.purge()?;

        let cover = self.repo.cover(id).await?;
        let mut tx = self.repo.begin().await?;
        let detached = self.detach_cover(tx.as_mut(), cover.as_ref()).await;
        let staged = match detached {
            Ok(()) => tx.purge(id).await.map_err(DomainError::from),
            Err(e) => Err(e),
        };
        self.finish(tx, staged.map(|_| None)).await?;

        tracing::info!(post_id = %id, user_id = %actor.user_id, "Post purged");
        self.cache.invalidate_post(id).await;
        Ok(())
    }

    // ----- internals -----

    async fn find_stored(&self, id: Uuid) -> Result<Post, DomainError> {
        self.repo
            .find(id, Visibility::WithTrashed)
            .await?
            .ok_or_else(|| DomainError::post_not_found(id))
    }

    async fn cached_details(&self, post: Post) -> Result<PostDetails, DomainError> {
        let key = self.cache.post_key_for(post.id).await;
        self.cache
            .remember(&key, || self.repo.load_details(post))
            .await
    }

    async fn unique_slug(&self, title: &str, except: Option<Uuid>) -> Result<String, DomainError> {
        let repo = &self.repo;
        generate_unique_slug(title, |candidate| async move {
            repo.slug_exists(&candidate, except).await
        })
        .await
        .map_err(|e| match e {
            SlugAsyncError::Slug(SlugError::Exhausted { base }) => {
                DomainError::Duplicate(format!("no free slug left for `{base}`"))
            }
            SlugAsyncError::Slug(e) => DomainError::Validation(format!("title: {e}")),
            SlugAsyncError::Predicate(e) => DomainError::Repository(e),
        })
    }

    async fn stage_create(
        &self,
        tx: &mut dyn PostTransaction,
        post: &Post,
        attachments: &PostAttachments,
    ) -> Result<Option<String>, DomainError> {
        tx.insert_post(post).await?;
        tx.sync_tags(post.id, &normalize_tag_names(&attachments.tags))
            .await?;
        self.reconcile_cover(tx, post.id, None, &attachments.cover)
            .await
    }

    async fn stage_update(
        &self,
        tx: &mut dyn PostTransaction,
        post: &Post,
        existing: Option<&CoverImage>,
        attachments: &PostAttachments,
    ) -> Result<Option<String>, DomainError> {
        tx.update_post(post).await?;
        tx.sync_tags(post.id, &normalize_tag_names(&attachments.tags))
            .await?;
        self.reconcile_cover(tx, post.id, existing, &attachments.cover)
            .await
    }

    /// Bring the cover in line with `input`. Returns the path of a newly
    /// stored upload so it can be removed if the transaction fails.
    async fn reconcile_cover(
        &self,
        tx: &mut dyn PostTransaction,
        post_id: Uuid,
        existing: Option<&CoverImage>,
        input: &CoverInput,
    ) -> Result<Option<String>, DomainError> {
        let existing_url = existing.map(|cover| self.cover_url(cover));
        let plan = plan_cover(existing, existing_url.as_deref(), input)
            .map_err(|e| DomainError::Validation(e.to_string()))?;
        let CoverPlan::Replace { discard, source } = plan else {
            return Ok(None);
        };

        if let Some(old) = discard {
            self.remove_blob(old).await?;
        }

        let (path, stored) = match source {
            CoverSource::Url(url) => (url.to_string(), None),
            CoverSource::Upload(upload) => {
                let path = self.store_upload(upload).await?;
                (path.clone(), Some(path))
            }
        };

        if let Err(e) = tx.save_cover(post_id, &path).await {
            self.discard_upload(stored).await;
            return Err(e.into());
        }

        tracing::debug!(post_id = %post_id, path = %path, "Cover staged");
        Ok(stored)
    }

    async fn detach_cover(
        &self,
        tx: &mut dyn PostTransaction,
        cover: Option<&CoverImage>,
    ) -> Result<(), DomainError> {
        let Some(cover) = cover else {
            return Ok(());
        };

        if cover.is_stored_locally() {
            self.remove_blob(&cover.path).await?;
        }
        tx.delete_cover(cover.post_id).await?;
        Ok(())
    }

    async fn store_upload(&self, upload: &CoverUpload) -> Result<String, DomainError> {
        let path = format!("{COVER_UPLOAD_DIR}/{}", upload.unique_filename());

        let bytes: Cow<'_, [u8]> = match (&self.images, upload.extension()) {
            (Some(processor), Some(ext)) => match processor.downscale(
                &upload.bytes,
                &ext,
                self.settings.cover_max_height,
                self.settings.cover_quality,
            ) {
                Ok(scaled) => Cow::Owned(scaled),
                Err(ImageError::UnsupportedFormat(format)) => {
                    tracing::debug!(format = %format, "Storing cover without resizing");
                    Cow::Borrowed(&upload.bytes)
                }
                Err(ImageError::Decode(e)) => {
                    tracing::debug!(filename = %upload.filename, error = %e, "Cover is not a readable image");
                    return Err(DomainError::Validation(
                        "The cover url must be an image.".to_string(),
                    ));
                }
                Err(e) => return Err(e.into()),
            },
            _ => Cow::Borrowed(&upload.bytes),
        };

        self.storage.put(&path, &bytes).await?;
        tracing::debug!(path = %path, size = bytes.len(), "Cover stored");
        Ok(path)
    }

    async fn remove_blob(&self, path: &str) -> Result<(), DomainError> {
        if self.storage.exists(path).await {
            self.storage.delete(path).await?;
            tracing::debug!(path = %path, "Removed stored cover");
        }
        Ok(())
    }

    async fn discard_upload(&self, stored: Option<String>) {
        if let Some(path) = stored {
            if let Err(e) = self.storage.delete(&path).await {
                tracing::warn!(path = %path, error = %e, "Failed to remove orphaned upload");
            }
        }
    }

    /// Commit when staging succeeded, roll back otherwise.
    async fn finish(
        &self,
        tx: Box<dyn PostTransaction>,
        staged: Result<Option<String>, DomainError>,
    ) -> Result<(), DomainError> {
        match staged {
            Ok(stored) => {
                if let Err(e) = tx.commit().await {
                    self.discard_upload(stored).await;
                    return Err(e.into());
                }
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}
