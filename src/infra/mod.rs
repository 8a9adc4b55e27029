pub mod cache;
pub mod db;
pub mod error;
pub mod search;
pub mod telemetry;
