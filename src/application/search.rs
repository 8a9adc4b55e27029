//! Search index port: the disposable full-text projection of posts.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::domain::posts::{PostPatch, SearchDocument};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("search transport error: {0}")]
    Transport(String),
    #[error("unexpected search response: {0}")]
    Decode(String),
}

impl SearchError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Typed partial update for an indexed document.
///
/// The original backend built its update script by concatenating the
/// document's own key/value pairs into source text, which breaks on values
/// containing quotes. This is the replacement: an explicit set of optional
/// fields that adapters compile into parameter-bound assignments, so values
/// never touch the script source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

impl From<&PostPatch> for DocumentPatch {
    fn from(patch: &PostPatch) -> Self {
        Self {
            title: patch.title.clone(),
            content: patch.content.clone(),
        }
    }
}

/// Ranked ids plus the dual-mode hit total. Documents are never returned
/// whole; callers hydrate full records from the store by id.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub ids: Vec<Uuid>,
    pub total: u64,
}

/// Port over the external search engine.
///
/// Every failure surfaces as a [`SearchError`]; there is no retry or backoff
/// in this layer. A failed index write after a successful store write leaves
/// the two momentarily inconsistent by design.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index_post(&self, document: &SearchDocument) -> Result<(), SearchError>;

    /// Patch the existing document's fields to match the current post.
    async fn update_post(&self, id: Uuid, patch: &DocumentPatch) -> Result<(), SearchError>;

    /// Multi-field match over title and content, ordered by creation time
    /// ascending. With a cursor only documents with `id > cursor` match, and
    /// the total comes from a separate unfiltered count call (mirrors the
    /// record store's dual-mode count rule).
    async fn search(&self, text: &str, page: PageRequest) -> Result<SearchPage, SearchError>;

    /// Delete by matching the `id` field rather than the document key, to
    /// tolerate id/document-key mismatches.
    async fn remove(&self, id: Uuid) -> Result<(), SearchError>;
}
