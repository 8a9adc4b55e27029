//! Post synchronization service: the only component with write access to the
//! record store, the search index, and the listing cache.

mod commands;
mod queries;
mod service;
pub mod types;

pub use service::PostService;
pub use types::{CreatePostCommand, PostServiceError, UpdatePostCommand};
