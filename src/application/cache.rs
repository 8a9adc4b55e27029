//! Listing cache port and key derivation.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::PageRequest;

/// Namespace prefix for every cached listing response. Invalidation drops the
/// whole namespace because listing keys encode arbitrary caller-supplied page
/// parameters the writer cannot predict.
pub const POSTS_LISTING_NAMESPACE: &str = "posts-listing";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Key/value cache with TTL and namespace-wide invalidation.
///
/// Entries are pure derived state: losing all of them must never change query
/// results, only latency. There is deliberately no per-key invalidation.
#[async_trait]
pub trait ListingCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Drop every entry whose key lives under `namespace`.
    async fn invalidate_namespace(&self, namespace: &str) -> Result<(), CacheError>;
}

/// Derive the cache key for one listing request.
///
/// The raw (pre-clamp) parameters participate so that distinct requests never
/// share an entry, matching how the original keyed by request query string.
pub fn listing_key(page: &PageRequest) -> String {
    let offset = page
        .offset
        .map_or_else(|| "-".to_string(), |value| value.to_string());
    let limit = page
        .limit
        .map_or_else(|| "-".to_string(), |value| value.to_string());
    let cursor = page
        .cursor
        .map_or_else(|| "-".to_string(), |value| value.to_string());
    format!("{POSTS_LISTING_NAMESPACE}:offset={offset}:limit={limit}:cursor={cursor}")
}
