//! Read protocols: cached listing, and search-then-hydrate.

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::cache::listing_key;
use crate::application::pagination::{Page, PageRequest};
use crate::domain::posts::PostRecord;

use super::service::PostService;
use super::types::PostServiceError;

impl PostService {
    pub async fn get_post(&self, id: Uuid) -> Result<PostRecord, PostServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(PostServiceError::NotFound)
    }

    /// Serve a listing page from the cache when present, otherwise recompute
    /// it from the record store and cache it with a fixed TTL.
    pub async fn list_posts(
        &self,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, PostServiceError> {
        let key = listing_key(&page);

        if let Some(value) = self.cache.get(&key).await? {
            match serde_json::from_value::<Page<PostRecord>>(value) {
                Ok(cached) => return Ok(cached),
                // A shape mismatch means a stale serialization format; fall
                // through to a recompute instead of failing the read.
                Err(err) => warn!(%key, error = %err, "discarding undecodable cache entry"),
            }
        }

        let listing = self.store.list_posts(page).await?;

        match serde_json::to_value(&listing) {
            Ok(value) => self.cache.set(&key, value, self.listing_ttl).await?,
            Err(err) => warn!(%key, error = %err, "listing not cacheable"),
        }

        Ok(listing)
    }

    /// Query the index for ranked ids, hydrate full records from the store,
    /// and re-order the hydrated rows to the index's ranked order.
    ///
    /// Ids present in the index but absent from the store are dangling
    /// references (a delete whose index removal failed, or in-flight drift);
    /// they are dropped silently rather than surfaced. This path never goes
    /// through the listing cache.
    pub async fn search_posts(
        &self,
        text: &str,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, PostServiceError> {
        let hits = self.index.search(text, page).await?;

        if hits.ids.is_empty() {
            return Ok(Page::new(Vec::new(), hits.total));
        }

        let records = self.store.find_by_ids(&hits.ids).await?;
        let mut by_id: HashMap<Uuid, PostRecord> =
            records.into_iter().map(|post| (post.id, post)).collect();

        let mut items = Vec::with_capacity(hits.ids.len());
        let mut dangling = 0usize;
        for id in &hits.ids {
            match by_id.remove(id) {
                Some(post) => items.push(post),
                None => dangling += 1,
            }
        }
        if dangling > 0 {
            debug!(dangling, "dropped index hits with no store row");
        }

        Ok(Page::new(items, hits.total))
    }

    /// Posts containing `paragraph` verbatim in their paragraphs array.
    pub async fn posts_with_paragraph(
        &self,
        paragraph: &str,
    ) -> Result<Vec<PostRecord>, PostServiceError> {
        Ok(self.store.find_by_paragraph(paragraph).await?)
    }
}
