//! PostgreSQL store for synced directory users.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::sync::DirectoryRecord;
use crate::ports::{DirectoryUserRepository, SyncStoreError};

/// Upserts directory records keyed by their external id.
pub struct PostgresDirectoryUserRepository {
    pool: PgPool,
}

impl PostgresDirectoryUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryUserRepository for PostgresDirectoryUserRepository {
    async fn upsert(&self, record: &DirectoryRecord) -> Result<(), SyncStoreError> {
        sqlx::query(
            r#"
            INSERT INTO directory_users (external_id, email, display_name, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE
            SET email = EXCLUDED.email,
                display_name = EXCLUDED.display_name,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.external_id)
        .bind(&record.email)
        .bind(&record.display_name)
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| SyncStoreError::Unavailable(e.to_string()))?;

        Ok(())
    }
}

impl std::fmt::Debug for PostgresDirectoryUserRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDirectoryUserRepository").finish_non_exhaustive()
    }
}
