//! PostgreSQL cursor store with generation-guarded writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::Timestamp;
use crate::domain::sync::{SyncCursor, SyncStatus};
use crate::ports::{SyncCursorRepository, SyncStoreError};

/// PostgreSQL-backed sync cursor repository.
///
/// Every write bumps the `generation` column; callers pass the generation
/// they read, and a mismatch means another worker moved the cursor first.
pub struct PostgresSyncCursorRepository {
    pool: PgPool,
}

impl PostgresSyncCursorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CursorRow {
    job: String,
    token: Option<String>,
    status: String,
    generation: i64,
    updated_at: DateTime<Utc>,
}

impl CursorRow {
    fn into_cursor(self) -> Result<SyncCursor, SyncStoreError> {
        let status = SyncStatus::parse(&self.status).ok_or_else(|| {
            SyncStoreError::Unavailable(format!(
                "unrecognized cursor status '{}' for job '{}'",
                self.status, self.job
            ))
        })?;

        Ok(SyncCursor {
            job: self.job,
            token: self.token,
            status,
            generation: self.generation,
            updated_at: Timestamp::from_datetime(self.updated_at),
        })
    }
}

#[async_trait]
impl SyncCursorRepository for PostgresSyncCursorRepository {
    async fn load(&self, job: &str) -> Result<Option<SyncCursor>, SyncStoreError> {
        let row: Option<CursorRow> = sqlx::query_as(
            r#"
            SELECT job, token, status, generation, updated_at
            FROM sync_cursors
            WHERE job = $1
            "#,
        )
        .bind(job)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SyncStoreError::Unavailable(e.to_string()))?;

        row.map(CursorRow::into_cursor).transpose()
    }

    async fn create(&self, cursor: &SyncCursor) -> Result<(), SyncStoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_cursors (job, token, status, generation, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&cursor.job)
        .bind(&cursor.token)
        .bind(cursor.status.as_str())
        .bind(cursor.generation)
        .bind(cursor.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("sync_cursors_pkey") {
                    return SyncStoreError::GenerationConflict;
                }
            }
            SyncStoreError::Unavailable(e.to_string())
        })?;

        Ok(())
    }

    async fn save(
        &self,
        cursor: &SyncCursor,
        expected_generation: i64,
    ) -> Result<i64, SyncStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sync_cursors
            SET token = $1,
                status = $2,
                generation = generation + 1,
                updated_at = $3
            WHERE job = $4 AND generation = $5
            "#,
        )
        .bind(&cursor.token)
        .bind(cursor.status.as_str())
        .bind(cursor.updated_at.as_datetime())
        .bind(&cursor.job)
        .bind(expected_generation)
        .execute(&self.pool)
        .await
        .map_err(|e| SyncStoreError::Unavailable(e.to_string()))?;

        if result.rows_affected() != 1 {
            return Err(SyncStoreError::GenerationConflict);
        }

        Ok(expected_generation + 1)
    }
}

impl std::fmt::Debug for PostgresSyncCursorRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSyncCursorRepository").finish_non_exhaustive()
    }
}
