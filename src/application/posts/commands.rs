//! Mutation protocol: store first, then index, then unconditional cache drop.
//!
//! There is no two-phase commit and no compensating transaction. A failed
//! index write after a committed store write is surfaced to the caller, but
//! the store row stays; an out-of-band reconciliation sweep repairs drift.

use metrics::counter;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::cache::{CacheError, POSTS_LISTING_NAMESPACE};
use crate::application::repos::CreatePostParams;
use crate::application::search::DocumentPatch;
use crate::domain::posts::{PostDraft, PostRecord};

use super::service::PostService;
use super::types::{CreatePostCommand, PostServiceError, UpdatePostCommand};

impl PostService {
    pub async fn create_post(
        &self,
        command: CreatePostCommand,
    ) -> Result<PostRecord, PostServiceError> {
        let draft = PostDraft::new(
            command.title,
            command.content,
            command.paragraphs,
            command.author_id,
        )?;

        let post = self
            .writer
            .create_post(CreatePostParams {
                title: draft.title,
                content: draft.content,
                paragraphs: draft.paragraphs,
                author_id: draft.author_id,
            })
            .await?;

        info!(post_id = %post.id, "post created");

        let index_result = self.index.index_post(&post.search_document()).await;
        if let Err(err) = &index_result {
            counter!("folio_search_write_failures_total").increment(1);
            warn!(post_id = %post.id, error = %err, "index write failed after store commit");
        }

        let cache_result = self.invalidate_listings().await;

        index_result?;
        cache_result?;
        Ok(post)
    }

    pub async fn update_post(
        &self,
        id: Uuid,
        command: UpdatePostCommand,
    ) -> Result<PostRecord, PostServiceError> {
        let patch = command.into_patch();
        patch.validate()?;

        let updated = self.writer.update_post(id, &patch).await?;

        // Paragraph-only updates do not touch the projection; the document
        // carries title and content.
        let document_patch = DocumentPatch::from(&patch);
        let index_result = if document_patch.is_empty() {
            debug!(post_id = %id, "patch has no indexed fields, skipping index update");
            Ok(())
        } else {
            self.index.update_post(id, &document_patch).await
        };
        if let Err(err) = &index_result {
            counter!("folio_search_write_failures_total").increment(1);
            warn!(post_id = %id, error = %err, "index update failed after store commit");
        }

        let cache_result = self.invalidate_listings().await;

        index_result?;
        cache_result?;
        Ok(updated)
    }

    pub async fn delete_post(&self, id: Uuid) -> Result<(), PostServiceError> {
        self.writer.delete_post(id).await?;

        info!(post_id = %id, "post deleted");

        let index_result = self.index.remove(id).await;
        if let Err(err) = &index_result {
            counter!("folio_search_write_failures_total").increment(1);
            warn!(post_id = %id, error = %err, "index removal failed after store delete");
        }

        let cache_result = self.invalidate_listings().await;

        index_result?;
        cache_result?;
        Ok(())
    }

    /// Drop the whole listing namespace. Awaited before the mutation call
    /// returns so a reader can never observe stale cached data after the
    /// mutation has been acknowledged.
    pub(crate) async fn invalidate_listings(&self) -> Result<(), CacheError> {
        self.cache
            .invalidate_namespace(POSTS_LISTING_NAMESPACE)
            .await
    }
}
