//! Folio keeps a post collection queryable by primary key, by keyset-paginated
//! listing, and by free-text search, while keeping a listing cache warm.
//!
//! Three independently-failing backends cooperate: a Postgres store of record,
//! an Elasticsearch-compatible index holding a disposable projection of each
//! post, and a TTL'd listing cache. [`application::posts::PostService`] owns
//! the fan-out protocol between them. Every mutation writes the store first,
//! then the index, then drops the listing cache. There is no rollback and no
//! retry; the store stays authoritative and index drift is repaired out of
//! band.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
