//! Repository ports describing the record store adapter.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::posts::{PostPatch, PostRecord};

/// Failures the record store adapter can actually produce against the posts
/// schema. The table has no foreign keys and no user-visible unique
/// constraints, so there is no constraint-violation taxonomy here; anything
/// the driver reports beyond a missing row or a timeout is an unclassified
/// persistence failure.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub content: String,
    pub paragraphs: Vec<String>,
    pub author_id: Uuid,
}

/// Read side of the record store.
///
/// Point lookups report a missing id as `Ok(None)`; connectivity failures are
/// propagated, never retried here.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    /// Hydration fetch for search results. Ids without a matching row are
    /// simply absent from the output; callers decide what a dangling
    /// reference means.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostRecord>, RepoError>;

    /// Posts whose `paragraphs` array contains `paragraph` verbatim.
    async fn find_by_paragraph(&self, paragraph: &str) -> Result<Vec<PostRecord>, RepoError>;

    /// List posts ordered by creation time ascending.
    ///
    /// With a cursor only rows with `id > cursor` are returned, but
    /// `Page::total` still reports the full table count (dual-mode count
    /// rule; see [`crate::application::pagination::Page`]).
    async fn list_posts(&self, page: PageRequest) -> Result<Page<PostRecord>, RepoError>;
}

/// Write side of the record store. The store is the authority: a failure here
/// aborts the whole mutation before anything else runs.
#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    /// Persist a new post; the store assigns id and both timestamps.
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Merge only the provided fields and bump `updated_at`.
    /// Returns [`RepoError::NotFound`] when the row is absent.
    async fn update_post(&self, id: Uuid, patch: &PostPatch) -> Result<PostRecord, RepoError>;

    /// Returns [`RepoError::NotFound`] when no row was deleted.
    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}
