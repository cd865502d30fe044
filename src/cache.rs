//! In-process query cache.
//!
//! Each entry is a JSON payload keyed by the resource kind and its request
//! parameters. An entry is *fresh* until its kind's `stale_after` elapses
//! or it is invalidated, and is dropped entirely once `gc_after` elapses.
//! Stale entries can still be read with [`QueryCache::get_stale`], which the
//! client falls back to when a refetch fails.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    List { offset: u32, limit: u32 },
    /// Lowercase id or name.
    Detail(String),
    Species(String),
    Search { query: String, limit: u32 },
}

impl QueryKey {
    pub fn detail(id_or_name: &str) -> Self {
        QueryKey::Detail(id_or_name.trim().to_lowercase())
    }

    pub fn species(id_or_name: &str) -> Self {
        QueryKey::Species(id_or_name.trim().to_lowercase())
    }

    pub fn search(query: &str, limit: u32) -> Self {
        QueryKey::Search {
            query: query.trim().to_lowercase(),
            limit,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        match self {
            QueryKey::List { .. } => CachePolicy::minutes(10, 15),
            QueryKey::Detail(_) | QueryKey::Species(_) => CachePolicy::minutes(15, 30),
            QueryKey::Search { .. } => CachePolicy::minutes(5, 10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub stale_after: Duration,
    pub gc_after: Duration,
}

impl CachePolicy {
    pub const fn minutes(stale: u64, gc: u64) -> Self {
        Self {
            stale_after: Duration::from_secs(stale * 60),
            gc_after: Duration::from_secs(gc * 60),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fetched_at: Instant,
    invalidated: bool,
    payload: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lookup<T: DeserializeOwned>(&self, key: &QueryKey, max_age: Duration, fresh: bool) -> Option<T> {
        let entries = self.read();
        let entry = entries.get(key)?;
        if entry.fetched_at.elapsed() >= max_age || (fresh && entry.invalidated) {
            return None;
        }
        match serde_json::from_value(entry.payload.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(?key, error = %e, "cached payload has unexpected shape");
                None
            }
        }
    }

    /// Value that has not gone stale yet.
    pub fn get_fresh<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let hit = self.lookup(key, key.policy().stale_after, true);
        trace!(?key, hit = hit.is_some(), "cache lookup");
        hit
    }

    /// Value that may be stale or invalidated but has not been collected.
    pub fn get_stale<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        self.lookup(key, key.policy().gc_after, false)
    }

    pub fn insert<T: Serialize>(&self, key: QueryKey, value: &T) {
        match serde_json::to_value(value) {
            Ok(payload) => {
                self.write().insert(
                    key,
                    CacheEntry {
                        fetched_at: Instant::now(),
                        invalidated: false,
                        payload,
                    },
                );
            }
            Err(e) => debug!(?key, error = %e, "not caching unserializable value"),
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Mark every list page stale; the payloads stay readable through
    /// `get_stale` until collected.
    pub fn invalidate_lists(&self) {
        self.invalidate_where(|k| matches!(k, QueryKey::List { .. }));
    }

    pub fn invalidate_search(&self) {
        self.invalidate_where(|k| matches!(k, QueryKey::Search { .. }));
    }

    fn invalidate_where(&self, pred: impl Fn(&QueryKey) -> bool) {
        for (key, entry) in self.write().iter_mut() {
            if pred(key) {
                entry.invalidated = true;
            }
        }
    }

    /// Drop entries past their gc window. Returns how many were removed.
    pub fn collect_garbage(&self) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|k, e| e.fetched_at.elapsed() < k.policy().gc_after);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "cache entries collected");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_key() -> QueryKey {
        QueryKey::List {
            offset: 0,
            limit: 20,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_go_stale_then_get_collected() {
        let cache = QueryCache::new();
        cache.insert(list_key(), &vec!["bulbasaur".to_string()]);
        assert_eq!(
            cache.get_fresh::<Vec<String>>(&list_key()),
            Some(vec!["bulbasaur".to_string()])
        );

        tokio::time::advance(Duration::from_secs(11 * 60)).await;
        assert!(cache.get_fresh::<Vec<String>>(&list_key()).is_none());
        assert!(cache.get_stale::<Vec<String>>(&list_key()).is_some());
        assert_eq!(cache.collect_garbage(), 0);

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        assert!(cache.get_stale::<Vec<String>>(&list_key()).is_none());
        assert_eq!(cache.collect_garbage(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn kinds_have_independent_timers() {
        let cache = QueryCache::new();
        cache.insert(QueryKey::search("pika", 20), &1u32);
        cache.insert(QueryKey::detail("25"), &2u32);
        tokio::time::advance(Duration::from_secs(6 * 60)).await;
        assert!(cache.get_fresh::<u32>(&QueryKey::search("pika", 20)).is_none());
        assert_eq!(cache.get_fresh::<u32>(&QueryKey::detail("25")), Some(2));
    }

    #[test]
    fn keys_are_normalised() {
        assert_eq!(QueryKey::detail(" Pikachu "), QueryKey::Detail("pikachu".into()));
        assert_eq!(QueryKey::search("PIKA", 5), QueryKey::search("pika ", 5));
    }

    #[test]
    fn invalidation_is_scoped_by_kind() {
        let cache = QueryCache::new();
        let search = QueryKey::search("pika", 20);
        cache.insert(list_key(), &0u32);
        cache.insert(QueryKey::detail("pikachu"), &0u32);
        cache.insert(search.clone(), &0u32);

        cache.invalidate_lists();
        assert!(cache.get_fresh::<u32>(&list_key()).is_none());
        assert_eq!(cache.get_stale::<u32>(&list_key()), Some(0));
        assert_eq!(cache.get_fresh::<u32>(&search), Some(0));

        cache.invalidate_search();
        assert!(cache.get_fresh::<u32>(&search).is_none());
        assert_eq!(cache.get_fresh::<u32>(&QueryKey::detail("PIKACHU")), Some(0));
        assert_eq!(cache.len(), 3);

        // A new insert is fresh again.
        cache.insert(list_key(), &1u32);
        assert_eq!(cache.get_fresh::<u32>(&list_key()), Some(1));
    }

    #[test]
    fn shape_mismatch_is_a_miss() {
        let cache = QueryCache::new();
        cache.insert(list_key(), &"text");
        assert!(cache.get_fresh::<u32>(&list_key()).is_none());
    }
}
