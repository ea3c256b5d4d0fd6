//! Sync cursor persistence port.

use async_trait::async_trait;

use crate::domain::sync::SyncCursor;

/// Port for the durable per-job sync cursor.
///
/// Every write is a compare-and-swap on the cursor's generation counter: the
/// stored row is only updated if its generation still equals the value the
/// caller last observed, and the write bumps the generation. A generation
/// mismatch means another run took the cursor over and the caller must abort.
#[async_trait]
pub trait SyncCursorRepository: Send + Sync {
    /// Loads the cursor for a job, or `None` if the job has never run.
    async fn load(&self, job: &str) -> Result<Option<SyncCursor>, SyncStoreError>;

    /// Creates the cursor row for a job's first ever run.
    ///
    /// # Errors
    ///
    /// `GenerationConflict` if a concurrent first run inserted the row.
    async fn create(&self, cursor: &SyncCursor) -> Result<(), SyncStoreError>;

    /// Persists the cursor if its stored generation equals
    /// `expected_generation`, returning the new (incremented) generation.
    ///
    /// # Errors
    ///
    /// `GenerationConflict` if the stored generation moved on, meaning a
    /// concurrent run owns the cursor now.
    async fn save(
        &self,
        cursor: &SyncCursor,
        expected_generation: i64,
    ) -> Result<i64, SyncStoreError>;
}

/// Errors surfaced by cursor persistence.
#[derive(Debug, thiserror::Error)]
pub enum SyncStoreError {
    /// Compare-and-swap failed: another run advanced the cursor.
    #[error("cursor generation conflict")]
    GenerationConflict,

    /// The persistence layer is unreachable or failed.
    #[error("sync store unavailable: {0}")]
    Unavailable(String),
}
