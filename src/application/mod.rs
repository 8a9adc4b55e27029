pub mod cache;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod search;
