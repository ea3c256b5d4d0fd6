//! Local reconciliation target for directory records.

use async_trait::async_trait;

use crate::domain::sync::DirectoryRecord;

use super::sync_cursor_repository::SyncStoreError;

/// Port for the local table that mirrors the external directory.
#[async_trait]
pub trait DirectoryUserRepository: Send + Sync {
    /// Inserts or updates the local copy of a directory record.
    ///
    /// Last-write-wins keyed by `external_id`; repeating the same record is
    /// safe and changes nothing beyond the first application.
    async fn upsert(&self, record: &DirectoryRecord) -> Result<(), SyncStoreError>;
}
