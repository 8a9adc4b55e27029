//! In-process listing cache with TTL and namespace invalidation.
//!
//! Stands in for an external key/value cache behind the
//! [`ListingCache`] port. Keys follow the `<namespace>:<params>` convention;
//! alongside the entry map the store keeps a per-namespace set of live keys,
//! so invalidating a namespace drains that set instead of scanning the whole
//! key space.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::application::cache::{CacheError, ListingCache};

struct CacheSlot {
    value: serde_json::Value,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheSlot>,
    namespaces: HashMap<String, HashSet<String>>,
}

#[derive(Default)]
pub struct MemoryListingCache {
    state: RwLock<CacheState>,
}

impl MemoryListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

fn namespace_of(key: &str) -> &str {
    key.split_once(':').map_or(key, |(namespace, _)| namespace)
}

#[async_trait]
impl ListingCache for MemoryListingCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        {
            let state = self.state.read().await;
            match state.entries.get(key) {
                Some(slot) if slot.expires_at > Instant::now() => {
                    counter!("folio_listing_cache_hit_total").increment(1);
                    return Ok(Some(slot.value.clone()));
                }
                Some(_) => {}
                None => {
                    counter!("folio_listing_cache_miss_total").increment(1);
                    return Ok(None);
                }
            }
        }

        // Entry exists but its TTL elapsed; drop it under the write lock.
        let mut state = self.state.write().await;
        if state
            .entries
            .get(key)
            .is_some_and(|slot| slot.expires_at <= Instant::now())
        {
            state.entries.remove(key);
            if let Some(keys) = state.namespaces.get_mut(namespace_of(key)) {
                keys.remove(key);
            }
            counter!("folio_listing_cache_expired_total").increment(1);
        }
        counter!("folio_listing_cache_miss_total").increment(1);
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        state.entries.insert(
            key.to_string(),
            CacheSlot {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        state
            .namespaces
            .entry(namespace_of(key).to_string())
            .or_default()
            .insert(key.to_string());
        Ok(())
    }

    async fn invalidate_namespace(&self, namespace: &str) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        let Some(keys) = state.namespaces.remove(namespace) else {
            return Ok(());
        };

        let mut removed = 0u64;
        for key in keys {
            if state.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        counter!("folio_listing_cache_invalidated_total").increment(removed);
        Ok(())
    }
}
