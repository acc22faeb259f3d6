//! Query cache with staleness marking.
//!
//! Events never write into the cache. They only mark whole query families
//! stale, and the next [`QueryCache::get_or_fetch`] for a stale entry goes
//! back to the server.

use std::future::Future;

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use tracker_core::logging::{COMPONENT_CACHE, SUBSYSTEM_CLIENT};
use tracker_core::EventKind;

use crate::error::Result;
use crate::query::{invalidations_for, QueryKey};

/// A cached query: its family plus a scope such as a project or issue id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: QueryKey,
    pub scope: String,
}

impl CacheKey {
    pub fn new(query: QueryKey, scope: impl Into<String>) -> Self {
        Self {
            query,
            scope: scope.into(),
        }
    }

    /// Unscoped key, e.g. the caller's own notification list.
    pub fn unscoped(query: QueryKey) -> Self {
        Self::new(query, "")
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    stale: bool,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<CacheKey, Entry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fresh value.
    pub fn insert(&self, key: CacheKey, value: Value) {
        self.entries.insert(key, Entry { value, stale: false });
    }

    /// Cached value, fresh or stale.
    pub fn peek(&self, key: &CacheKey) -> Option<Value> {
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// `None` when the key is not cached.
    pub fn is_stale(&self, key: &CacheKey) -> Option<bool> {
        self.entries.get(key).map(|e| e.stale)
    }

    /// Mark every entry of `query` stale. Returns how many were marked.
    pub fn mark_stale(&self, query: QueryKey) -> usize {
        let mut marked = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().query == query && !entry.stale {
                entry.stale = true;
                marked += 1;
            }
        }
        marked
    }

    /// Mark every entry stale. Used after a reconnect, since events sent while
    /// the stream was down are lost.
    pub fn mark_all_stale(&self) -> usize {
        let mut marked = 0;
        for mut entry in self.entries.iter_mut() {
            if !entry.stale {
                entry.stale = true;
                marked += 1;
            }
        }
        marked
    }

    /// Apply the invalidations an event of `kind` implies.
    pub fn invalidate(&self, kind: EventKind) -> usize {
        let marked: usize = invalidations_for(kind)
            .iter()
            .map(|query| self.mark_stale(*query))
            .sum();
        if marked > 0 {
            debug!(
                subsystem = SUBSYSTEM_CLIENT,
                component = COMPONENT_CACHE,
                event_type = kind.as_str(),
                marked,
                "Marked cached queries stale"
            );
        }
        marked
    }

    /// Return the cached value if fresh; otherwise run `fetch` and cache its
    /// result. A failed fetch leaves the existing entry untouched.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Some(entry) = self.entries.get(&key) {
            if !entry.stale {
                return Ok(entry.value.clone());
            }
        }

        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fresh_entry_is_not_refetched() {
        let cache = QueryCache::new();
        let fetches = AtomicUsize::new(0);
        let key = CacheKey::unscoped(QueryKey::Notifications);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(key.clone(), || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({ "notifications": [] }))
                })
                .await
                .unwrap();
            assert_eq!(value, json!({ "notifications": [] }));
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_event_marks_family_stale_and_triggers_refetch() {
        let cache = QueryCache::new();
        let issues_a = CacheKey::new(QueryKey::Issues, "project-a");
        let issues_b = CacheKey::new(QueryKey::Issues, "project-b");
        let members = CacheKey::new(QueryKey::ProjectMembers, "project-a");
        cache.insert(issues_a.clone(), json!(1));
        cache.insert(issues_b.clone(), json!(1));
        cache.insert(members.clone(), json!(1));

        assert_eq!(cache.invalidate(EventKind::IssueUpdated), 2);
        assert_eq!(cache.is_stale(&issues_a), Some(true));
        assert_eq!(cache.is_stale(&issues_b), Some(true));
        assert_eq!(cache.is_stale(&members), Some(false));

        let value = cache
            .get_or_fetch(issues_a.clone(), || async { Ok(json!(2)) })
            .await
            .unwrap();
        assert_eq!(value, json!(2));
        assert_eq!(cache.is_stale(&issues_a), Some(false));
    }

    #[tokio::test]
    async fn test_connected_invalidates_nothing() {
        let cache = QueryCache::new();
        cache.insert(CacheKey::unscoped(QueryKey::Notifications), json!([]));
        assert_eq!(cache.invalidate(EventKind::Connected), 0);
    }

    #[test]
    fn test_mark_all_stale_covers_every_family() {
        let cache = QueryCache::new();
        let keys = [
            CacheKey::unscoped(QueryKey::Notifications),
            CacheKey::new(QueryKey::Issues, "p1"),
            CacheKey::new(QueryKey::Issue, "i1"),
            CacheKey::new(QueryKey::Activities, "p1"),
            CacheKey::new(QueryKey::ProjectMembers, "p1"),
        ];
        for key in &keys {
            cache.insert(key.clone(), json!(null));
        }
        cache.mark_stale(QueryKey::Issues);

        assert_eq!(cache.mark_all_stale(), 4);
        for key in &keys {
            assert_eq!(cache.is_stale(key), Some(true));
        }
        assert_eq!(cache.mark_all_stale(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_stale_value() {
        let cache = QueryCache::new();
        let key = CacheKey::unscoped(QueryKey::Notifications);
        cache.insert(key.clone(), json!("old"));
        cache.mark_stale(QueryKey::Notifications);

        let result = cache
            .get_or_fetch(key.clone(), || async {
                Err(ClientError::Fetch("offline".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.peek(&key), Some(json!("old")));
        assert_eq!(cache.is_stale(&key), Some(true));
    }
}
