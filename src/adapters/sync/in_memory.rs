//! In-memory sync persistence for tests and development.
//!
//! Mirrors the compare-and-swap contract of the Postgres adapters exactly,
//! including generation bumping, so engine behavior under conflicts can be
//! exercised without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::sync::{DirectoryRecord, SyncCursor};
use crate::ports::{DirectoryUserRepository, SyncCursorRepository, SyncStoreError};

/// In-memory cursor repository with CAS semantics.
#[derive(Debug, Default)]
pub struct InMemoryCursorRepository {
    cursors: Mutex<HashMap<String, SyncCursor>>,
    /// Successful saves remaining before forced conflicts (test hook).
    saves_before_conflict: Mutex<Option<u32>>,
}

impl InMemoryCursorRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every save after the next `n` successful ones fail with a
    /// generation conflict, simulating a concurrent run taking the cursor.
    pub fn conflict_after(&self, n: u32) {
        *self.saves_before_conflict.lock().unwrap() = Some(n);
    }
}

#[async_trait]
impl SyncCursorRepository for InMemoryCursorRepository {
    async fn load(&self, job: &str) -> Result<Option<SyncCursor>, SyncStoreError> {
        Ok(self.cursors.lock().unwrap().get(job).cloned())
    }

    async fn create(&self, cursor: &SyncCursor) -> Result<(), SyncStoreError> {
        let mut cursors = self.cursors.lock().unwrap();
        if cursors.contains_key(&cursor.job) {
            return Err(SyncStoreError::GenerationConflict);
        }
        cursors.insert(cursor.job.clone(), cursor.clone());
        Ok(())
    }

    async fn save(
        &self,
        cursor: &SyncCursor,
        expected_generation: i64,
    ) -> Result<i64, SyncStoreError> {
        {
            let mut budget = self.saves_before_conflict.lock().unwrap();
            if let Some(remaining) = budget.as_mut() {
                if *remaining == 0 {
                    return Err(SyncStoreError::GenerationConflict);
                }
                *remaining -= 1;
            }
        }

        let mut cursors = self.cursors.lock().unwrap();
        let stored = cursors
            .get_mut(&cursor.job)
            .ok_or(SyncStoreError::GenerationConflict)?;

        if stored.generation != expected_generation {
            return Err(SyncStoreError::GenerationConflict);
        }

        let new_generation = expected_generation + 1;
        *stored = SyncCursor {
            generation: new_generation,
            updated_at: cursor.updated_at,
            ..cursor.clone()
        };
        Ok(new_generation)
    }
}

/// In-memory reconciliation target.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, DirectoryRecord>>,
    /// External ids whose upserts fail (test hook).
    poisoned: Mutex<Vec<String>>,
}

impl InMemoryUserRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes upserts of this external id fail.
    pub fn poison(&self, external_id: &str) {
        self.poisoned.lock().unwrap().push(external_id.to_string());
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    /// True if no users are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the stored copy of a user.
    pub fn get(&self, external_id: &str) -> Option<DirectoryRecord> {
        self.users.lock().unwrap().get(external_id).cloned()
    }
}

#[async_trait]
impl DirectoryUserRepository for InMemoryUserRepository {
    async fn upsert(&self, record: &DirectoryRecord) -> Result<(), SyncStoreError> {
        if self
            .poisoned
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == &record.external_id)
        {
            return Err(SyncStoreError::Unavailable("poisoned record".to_string()));
        }

        self.users
            .lock()
            .unwrap()
            .insert(record.external_id.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::sync::SyncStatus;

    fn record(id: &str, email: &str) -> DirectoryRecord {
        DirectoryRecord {
            external_id: id.to_string(),
            email: email.to_string(),
            display_name: None,
            updated_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn create_then_load_round_trips() {
        let repo = InMemoryCursorRepository::new();
        let cursor = SyncCursor::new("syncuser");
        repo.create(&cursor).await.unwrap();

        let loaded = repo.load("syncuser").await.unwrap().unwrap();
        assert_eq!(loaded.status, SyncStatus::Idle);
        assert_eq!(loaded.generation, 0);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let repo = InMemoryCursorRepository::new();
        let cursor = SyncCursor::new("syncuser");
        repo.create(&cursor).await.unwrap();
        assert!(matches!(
            repo.create(&cursor).await,
            Err(SyncStoreError::GenerationConflict)
        ));
    }

    #[tokio::test]
    async fn save_bumps_generation_on_match() {
        let repo = InMemoryCursorRepository::new();
        let mut cursor = SyncCursor::new("syncuser");
        repo.create(&cursor).await.unwrap();

        cursor.begin();
        let generation = repo.save(&cursor, 0).await.unwrap();
        assert_eq!(generation, 1);

        let loaded = repo.load("syncuser").await.unwrap().unwrap();
        assert_eq!(loaded.generation, 1);
        assert_eq!(loaded.status, SyncStatus::Running);
    }

    #[tokio::test]
    async fn save_with_stale_generation_conflicts() {
        let repo = InMemoryCursorRepository::new();
        let mut cursor = SyncCursor::new("syncuser");
        repo.create(&cursor).await.unwrap();

        cursor.begin();
        repo.save(&cursor, 0).await.unwrap();

        // A second writer still holding generation 0 must be rejected.
        assert!(matches!(
            repo.save(&cursor, 0).await,
            Err(SyncStoreError::GenerationConflict)
        ));
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins() {
        let repo = InMemoryUserRepository::new();

        repo.upsert(&record("u1", "old@example.com")).await.unwrap();
        repo.upsert(&record("u1", "new@example.com")).await.unwrap();

        assert_eq!(repo.len(), 1);
        assert_eq!(repo.get("u1").unwrap().email, "new@example.com");
    }

    #[tokio::test]
    async fn poisoned_upsert_fails() {
        let repo = InMemoryUserRepository::new();
        repo.poison("bad");
        assert!(repo.upsert(&record("bad", "x@example.com")).await.is_err());
        assert!(repo.is_empty());
    }
}
