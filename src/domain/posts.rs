//! Post entities and the derived search projection.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Canonical post row, as persisted by the record store.
///
/// The store assigns `id` and both timestamps; `created_at` is immutable and
/// `updated_at` is bumped by the store on every successful update, so
/// `updated_at >= created_at` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub paragraphs: Vec<String>,
    pub author_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    /// Project this row into the denormalized document the search index owns.
    pub fn search_document(&self) -> SearchDocument {
        SearchDocument {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            author_id: self.author_id,
            created_at: self.created_at,
        }
    }
}

/// Validated creation input. `author_id` arrives already authenticated by an
/// external identity provider and is treated as an opaque field here.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub paragraphs: Vec<String>,
    pub author_id: Uuid,
}

impl PostDraft {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        paragraphs: Option<Vec<String>>,
        author_id: Uuid,
    ) -> Result<Self, DomainError> {
        let title = title.into();
        let content = content.into();
        ensure_non_empty(&title, "title")?;
        ensure_non_empty(&content, "content")?;

        Ok(Self {
            title,
            content,
            paragraphs: paragraphs.unwrap_or_default(),
            author_id,
        })
    }
}

/// Partial update with merge semantics: only present fields are written,
/// everything else is preserved. Author and creation time are immutable.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub paragraphs: Option<Vec<String>>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.paragraphs.is_none()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(title) = self.title.as_deref() {
            ensure_non_empty(title, "title")?;
        }
        if let Some(content) = self.content.as_deref() {
            ensure_non_empty(content, "content")?;
        }
        Ok(())
    }
}

/// Disposable per-post projection owned by the search index. Never a source
/// of truth; it may lag the record store between a store write and the
/// corresponding index write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(rename = "authorId")]
    pub author_id: Uuid,
    /// Carried so the index can order hits by creation time; immutable, so
    /// partial document updates never need to touch it.
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}
