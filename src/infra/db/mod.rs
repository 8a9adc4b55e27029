//! Postgres-backed record store.

mod posts;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::RepoError;
use crate::config::DatabaseSettings;
use crate::infra::error::InfraError;

/// Handle over the posts table; implements both repository ports.
#[derive(Clone)]
pub struct PostgresPostStore {
    pool: Arc<PgPool>,
}

impl PostgresPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, InfraError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.url)
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;

        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<(), InfraError> {
        sqlx::migrate!("./migrations")
            .run(self.pool())
            .await
            .map_err(|err| InfraError::database(err.to_string()))
    }

    pub async fn health_check(&self) -> Result<(), InfraError> {
        query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(|err| InfraError::database(err.to_string()))
    }

    pub(crate) fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}
