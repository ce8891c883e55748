//! Read-through caching for post reads, with generation-based invalidation
//! of listing pages.
//!
//! Listing keys embed a per-namespace generation number and single-post keys
//! a per-post one. Bumping the number orphans every entry cached under the
//! old one, so no pattern delete is needed and a slow read that finishes after
//! a write can only refill a key nobody reads any more. Orphaned entries age
//! out with their TTL.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::domain::{PostQuery, Visibility};
use crate::error::{DomainError, RepoError};
use crate::ports::Cache;

pub const PUBLIC_POSTS: &str = "api.v1.posts.public_";
pub const ADMIN_POSTS: &str = "api.v1.admin.posts_";
pub const FEATURED_POSTS: &str = "api.v1.posts.featured";
pub const LATEST_POSTS: &str = "api.v1.posts.latest";

/// Listing cache namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Public,
    Admin,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Public, Namespace::Admin];

    pub fn for_visibility(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Public => Namespace::Public,
            Visibility::WithTrashed => Namespace::Admin,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Namespace::Public => PUBLIC_POSTS,
            Namespace::Admin => ADMIN_POSTS,
        }
    }

    pub fn generation_key(&self) -> &'static str {
        match self {
            Namespace::Public => "api.v1.posts.public_generation",
            Namespace::Admin => "api.v1.admin.posts_generation",
        }
    }
}

/// Cache key of a single post under a given generation.
pub fn post_key(id: Uuid, generation: i64) -> String {
    format!("post_{id}_{generation}")
}

/// Counter key holding the generation of a single post.
pub fn post_generation_key(id: Uuid) -> String {
    format!("post_{id}_generation")
}

/// Cache key of a listing page under a given generation.
pub fn listing_key(generation: i64, query: &PostQuery) -> String {
    let namespace = Namespace::for_visibility(query.visibility);
    match namespace {
        Namespace::Public => format!("{}{generation}_{}", namespace.prefix(), query.page),
        Namespace::Admin => format!(
            "{}{generation}_{}_{}_{}",
            namespace.prefix(),
            query.page,
            query.publish.map(|p| p.as_str()).unwrap_or("all"),
            query.sort.as_str(),
        ),
    }
}

/// Cache facade used by the post service.
#[derive(Clone)]
pub struct PostCache {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl PostCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Current value of a generation counter; 0 when never bumped.
    async fn counter(&self, key: &str) -> i64 {
        self.cache
            .get(key)
            .await
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0)
    }

    /// Current generation of a namespace.
    pub async fn generation(&self, namespace: Namespace) -> i64 {
        self.counter(namespace.generation_key()).await
    }

    /// Key of post `id` under its current generation.
    pub async fn post_key_for(&self, id: Uuid) -> String {
        post_key(id, self.counter(&post_generation_key(id)).await)
    }

    pub async fn key_for(&self, query: &PostQuery) -> String {
        let generation = self
            .generation(Namespace::for_visibility(query.visibility))
            .await;
        listing_key(generation, query)
    }

    /// Return the cached value under `key`, or load, store and return it.
    ///
    /// Cache failures never fail the read; they fall through to `load`.
    pub async fn remember<T, F, Fut>(&self, key: &str, load: F) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RepoError>>,
    {
        if let Some(raw) = self.cache.get(key).await {
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    tracing::debug!(key = %key, "Cache hit");
                    return Ok(value);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "Discarding unreadable cache entry"),
            }
        }

        let value = load().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.cache.set(key, &raw, Some(self.ttl)).await {
                    tracing::warn!(key = %key, error = %e, "Cache write failed");
                }
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "Cache serialization failed"),
        }

        Ok(value)
    }

    /// Drop everything a write to post `id` may have made stale.
    pub async fn invalidate_post(&self, id: Uuid) {
        let post_generation = post_generation_key(id);
        if let Err(e) = self.cache.increment(&post_generation).await {
            // Without a new generation the current entry has to go explicitly
            let current = post_key(id, self.counter(&post_generation).await);
            tracing::warn!(key = %post_generation, error = %e, "Post generation bump failed");
            if let Err(e) = self.cache.delete(&current).await {
                tracing::warn!(key = %current, error = %e, "Cache invalidation failed");
            }
        }

        for key in [FEATURED_POSTS, LATEST_POSTS] {
            if let Err(e) = self.cache.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
            }
        }

        for namespace in Namespace::ALL {
            match self.cache.increment(namespace.generation_key()).await {
                Ok(generation) => {
                    tracing::debug!(key = namespace.generation_key(), generation, "Listing generation bumped")
                }
                Err(e) => tracing::warn!(
                    key = namespace.generation_key(),
                    error = %e,
                    "Listing generation bump failed; pages stay cached until TTL"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::{PublishState, SortOrder};
    use crate::ports::CacheError;

    #[derive(Default)]
    struct MapCache(Mutex<HashMap<String, String>>);

    #[async_trait]
    impl Cache for MapCache {
        async fn get(&self, key: &str) -> Option<String> {
            self.0.lock().unwrap().get(key).cloned()
        }

        async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> Result<(), CacheError> {
            self.0.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.0.lock().unwrap().remove(key);
            Ok(())
        }

        async fn exists(&self, key: &str) -> bool {
            self.0.lock().unwrap().contains_key(key)
        }

        async fn increment(&self, key: &str) -> Result<i64, CacheError> {
            let mut map = self.0.lock().unwrap();
            let next = map.get(key).and_then(|v| v.parse::<i64>().ok()).unwrap_or(0) + 1;
            map.insert(key.to_string(), next.to_string());
            Ok(next)
        }
    }

    #[test]
    fn test_public_listing_key() {
        assert_eq!(
            listing_key(3, &PostQuery::public(2)),
            "api.v1.posts.public_3_2"
        );
    }

    #[test]
    fn test_admin_listing_key_includes_filters() {
        let query = PostQuery::admin(1, Some(PublishState::Draft), SortOrder::OldestFirst);
        assert_eq!(listing_key(0, &query), "api.v1.admin.posts_0_1_draft_asc");

        let unfiltered = PostQuery::admin(1, None, SortOrder::NewestFirst);
        assert_eq!(listing_key(0, &unfiltered), "api.v1.admin.posts_0_1_all_desc");
    }

    #[test]
    fn test_post_key() {
        let id = Uuid::nil();
        assert_eq!(post_key(id, 2), format!("post_{id}_2"));
        assert_eq!(post_generation_key(id), format!("post_{id}_generation"));
    }

    /// A read that started before a write stores its stale value under the
    /// generation the write has already retired.
    #[tokio::test]
    async fn test_late_refill_after_write_is_unreachable() {
        let cache = PostCache::new(
            Arc::new(MapCache::default()),
            Duration::from_secs(60),
        );
        let id = Uuid::new_v4();

        let in_flight = cache.post_key_for(id).await;
        cache.invalidate_post(id).await;
        let stale: Result<String, DomainError> = cache
            .remember(&in_flight, || async { Ok("stale".to_string()) })
            .await;
        assert_eq!(stale.unwrap(), "stale");

        let fresh_key = cache.post_key_for(id).await;
        assert_ne!(fresh_key, in_flight);
        let fresh: Result<String, DomainError> = cache
            .remember(&fresh_key, || async { Ok("fresh".to_string()) })
            .await;
        assert_eq!(fresh.unwrap(), "fresh");
    }
}
