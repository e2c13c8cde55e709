use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outletdb_db::{DbError, NewDataset, ReplaceCounts};
use sqlx::PgPool;

use crate::traits::DatasetStore;

/// [`DatasetStore`] backed by the Postgres tables in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgDatasetStore {
    pool: PgPool,
}

impl PgDatasetStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatasetStore for PgDatasetStore {
    async fn replace_dataset(
        &self,
        dataset: NewDataset<'_>,
        completed_at: DateTime<Utc>,
    ) -> Result<ReplaceCounts, DbError> {
        outletdb_db::replace_dataset(&self.pool, dataset, completed_at).await
    }

    async fn last_ingested_at(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        outletdb_db::get_last_ingested_at(&self.pool).await
    }
}
