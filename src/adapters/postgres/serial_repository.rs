//! PostgreSQL implementation of the serial ledger.
//!
//! Uniqueness of serial codes and order ids is enforced by the table's
//! unique constraints; the claim transition is a single conditional UPDATE.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::Timestamp;
use crate::domain::license::LicenseSerial;
use crate::ports::{SerialRepository, SerialStoreError};

/// PostgreSQL serial ledger.
pub struct PostgresSerialRepository {
    pool: PgPool,
}

impl PostgresSerialRepository {
    /// Creates a repository over a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a license serial.
#[derive(Debug, sqlx::FromRow)]
struct SerialRow {
    id: Uuid,
    serial: String,
    order_id: String,
    claimed: bool,
    created_at: DateTime<Utc>,
}

impl From<SerialRow> for LicenseSerial {
    fn from(row: SerialRow) -> Self {
        LicenseSerial {
            id: row.id,
            serial: row.serial,
            order_id: row.order_id,
            claimed: row.claimed,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl SerialRepository for PostgresSerialRepository {
    async fn insert(&self, serial: &LicenseSerial) -> Result<(), SerialStoreError> {
        sqlx::query(
            r#"
            INSERT INTO license_serials (id, serial, order_id, claimed, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(serial.id)
        .bind(&serial.serial)
        .bind(&serial.order_id)
        .bind(serial.claimed)
        .bind(serial.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                match db_err.constraint() {
                    Some("license_serials_serial_key") => {
                        return SerialStoreError::DuplicateSerial;
                    }
                    Some("license_serials_order_id_key") => {
                        return SerialStoreError::DuplicateOrder;
                    }
                    _ => {}
                }
            }
            SerialStoreError::Unavailable(e.to_string())
        })?;

        Ok(())
    }

    async fn find_by_order(
        &self,
        order_id: &str,
    ) -> Result<Option<LicenseSerial>, SerialStoreError> {
        let row: Option<SerialRow> = sqlx::query_as(
            r#"
            SELECT id, serial, order_id, claimed, created_at
            FROM license_serials
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SerialStoreError::Unavailable(e.to_string()))?;

        Ok(row.map(LicenseSerial::from))
    }

    async fn claim(&self, serial: &str) -> Result<bool, SerialStoreError> {
        // The WHERE clause makes the false -> true transition atomic;
        // rows_affected distinguishes a successful claim from an already
        // claimed or unknown serial.
        let result = sqlx::query(
            r#"
            UPDATE license_serials
            SET claimed = TRUE
            WHERE serial = $1 AND claimed = FALSE
            "#,
        )
        .bind(serial)
        .execute(&self.pool)
        .await
        .map_err(|e| SerialStoreError::Unavailable(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}

impl std::fmt::Debug for PostgresSerialRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSerialRepository").finish_non_exhaustive()
    }
}
