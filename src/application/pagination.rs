//! Shared pagination types for listing and search.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Page selector shared by the record store and the search index.
///
/// Two mutually exclusive modes per call: offset paging when `cursor` is
/// absent, keyset paging (rows with id greater than the cursor) when present.
/// In both modes results are ordered by creation time ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub cursor: Option<Uuid>,
}

impl PageRequest {
    pub fn offset(offset: u32) -> Self {
        Self {
            offset: Some(offset),
            ..Self::default()
        }
    }

    pub fn keyset(cursor: Uuid) -> Self {
        Self {
            cursor: Some(cursor),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }
}

/// One page of results plus the collection-wide total.
///
/// `total` always reports how many rows exist in total for the scope, not how
/// many remain past the cursor. Keyset calls compute it through a separate
/// unfiltered count. The asymmetry is a documented contract; callers page by
/// cursor and render "n of total" from the same response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}
