use thiserror::Error;
use uuid::Uuid;

use crate::application::cache::CacheError;
use crate::application::repos::RepoError;
use crate::application::search::SearchError;
use crate::domain::error::DomainError;
use crate::domain::posts::PostPatch;

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub content: String,
    pub paragraphs: Option<Vec<String>>,
    pub author_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePostCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    pub paragraphs: Option<Vec<String>>,
}

impl UpdatePostCommand {
    pub fn into_patch(self) -> PostPatch {
        PostPatch {
            title: self.title,
            content: self.content,
            paragraphs: self.paragraphs,
        }
    }
}

/// Failure taxonomy of the synchronization service.
///
/// `Repo` failures abort the mutation before anything else executes. The
/// downstream variants (`SearchIndex`, `Cache`) surface after the record
/// store has already committed: an error response does not imply that no
/// state changed.
#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("post not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("record store failure: {0}")]
    Repo(RepoError),
    #[error("search index failure: {0}")]
    SearchIndex(#[from] SearchError),
    #[error("listing cache failure: {0}")]
    Cache(#[from] CacheError),
}

impl PostServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// True when the record store mutation committed but a secondary system
    /// failed afterwards.
    pub fn is_downstream(&self) -> bool {
        matches!(self, Self::SearchIndex(_) | Self::Cache(_))
    }
}

impl From<RepoError> for PostServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

impl From<DomainError> for PostServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message } => Self::Validation(message),
        }
    }
}
