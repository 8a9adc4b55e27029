use std::sync::Arc;
use std::time::Duration;

use crate::application::cache::ListingCache;
use crate::application::repos::{PostsRepo, PostsWriteRepo};
use crate::application::search::SearchIndex;

pub const DEFAULT_LISTING_TTL: Duration = Duration::from_secs(120);

/// Orchestrates the store → index → cache fan-out and both read protocols.
///
/// Holds its collaborators as trait objects so tests and alternative
/// deployments can swap adapters without touching the protocol.
#[derive(Clone)]
pub struct PostService {
    pub(crate) store: Arc<dyn PostsRepo>,
    pub(crate) writer: Arc<dyn PostsWriteRepo>,
    pub(crate) index: Arc<dyn SearchIndex>,
    pub(crate) cache: Arc<dyn ListingCache>,
    pub(crate) listing_ttl: Duration,
}

impl PostService {
    pub fn new(
        store: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        index: Arc<dyn SearchIndex>,
        cache: Arc<dyn ListingCache>,
    ) -> Self {
        Self {
            store,
            writer,
            index,
            cache,
            listing_ttl: DEFAULT_LISTING_TTL,
        }
    }

    pub fn with_listing_ttl(mut self, ttl: Duration) -> Self {
        self.listing_ttl = ttl;
        self
    }
}
