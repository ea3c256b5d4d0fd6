//! Batch synchronization engine.
//!
//! Reconciles local state against the paginated external directory. Each
//! invocation is short-lived: the engine checkpoints the cursor after every
//! page so the next invocation resumes exactly where this one stopped,
//! whether it completed, hit its time budget, or was torn down mid-run.
//! Stopping on the budget is expected incremental progress, not a failure.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::domain::sync::{SyncCursor, SyncStatus};
use crate::ports::{
    Directory, DirectoryError, DirectoryUserRepository, SyncCursorRepository, SyncStoreError,
};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RunOutcome {
    /// The directory was exhausted; the cursor is back at `Idle`.
    Completed { pages: u32, records: u64, skipped: u64 },
    /// The soft budget was reached; the cursor stays `Running` at the last
    /// persisted token and the next invocation picks it up.
    Paused { pages: u32, records: u64, skipped: u64 },
}

/// Errors surfaced by a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Another run appears to hold the cursor; skip this invocation.
    #[error("another sync run is in progress")]
    ConcurrentRun,

    /// Page fetch failed past the retry bound; cursor preserved at the
    /// failing page, status set to `Failed`.
    #[error("sync run failed: {0}")]
    Failed(String),

    /// Cursor persistence failed; the run stops without a status write.
    #[error("sync store error: {0}")]
    Store(#[from] SyncStoreError),
}

/// Drives one reconciliation run per call.
pub struct SyncEngine {
    directory: Arc<dyn Directory>,
    cursors: Arc<dyn SyncCursorRepository>,
    users: Arc<dyn DirectoryUserRepository>,
    config: SyncConfig,
}

impl SyncEngine {
    /// Job name for the user directory reconciliation.
    pub const USER_SYNC_JOB: &'static str = "syncuser";

    /// Creates an engine over its three ports.
    pub fn new(
        directory: Arc<dyn Directory>,
        cursors: Arc<dyn SyncCursorRepository>,
        users: Arc<dyn DirectoryUserRepository>,
        config: SyncConfig,
    ) -> Self {
        Self {
            directory,
            cursors,
            users,
            config,
        }
    }

    /// Executes one run of the named job.
    ///
    /// Safe to invoke more often than scheduled: a run that finds a fresh
    /// `Running` cursor skips with [`SyncError::ConcurrentRun`] instead of
    /// interfering.
    pub async fn run(&self, job: &str) -> Result<RunOutcome, SyncError> {
        let started = Instant::now();
        let (mut cursor, mut generation) = self.claim(job).await?;

        info!(
            job,
            generation,
            token = cursor.token.as_deref().unwrap_or("<start>"),
            "sync run started"
        );

        let mut pages: u32 = 0;
        let mut records: u64 = 0;
        let mut skipped: u64 = 0;

        loop {
            // Cooperative cancellation: budget checks happen only between
            // pages, never inside a page's reconciliation.
            if started.elapsed() >= self.config.time_budget()
                || pages >= self.config.max_pages_per_run
            {
                info!(job, pages, records, "sync run paused at budget");
                return Ok(RunOutcome::Paused {
                    pages,
                    records,
                    skipped,
                });
            }

            let page = match self.fetch_with_retry(cursor.token.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    // The cursor keeps the token of the failing page so the
                    // next invocation retries exactly this page.
                    cursor.fail();
                    self.cursors.save(&cursor, generation).await?;
                    warn!(job, error = %e, "sync run failed; cursor preserved");
                    return Err(SyncError::Failed(e.to_string()));
                }
            };

            for record in &page.records {
                match self.users.upsert(record).await {
                    Ok(()) => records += 1,
                    Err(e) => {
                        // A single bad record must not abort the page.
                        skipped += 1;
                        warn!(
                            job,
                            external_id = %record.external_id,
                            error = %e,
                            "skipping record"
                        );
                    }
                }
            }

            let done = page.is_last();
            cursor.advance(page.next_token);
            generation = self.cursors.save(&cursor, generation).await?;
            pages += 1;

            if done {
                info!(job, pages, records, skipped, "sync run completed");
                return Ok(RunOutcome::Completed {
                    pages,
                    records,
                    skipped,
                });
            }
        }
    }

    /// Loads (or creates) the cursor and claims it for this run.
    async fn claim(&self, job: &str) -> Result<(SyncCursor, i64), SyncError> {
        let mut cursor = match self.cursors.load(job).await? {
            Some(cursor) => cursor,
            None => {
                let cursor = SyncCursor::new(job);
                match self.cursors.create(&cursor).await {
                    Ok(()) => cursor,
                    // A concurrent first run inserted the row between our
                    // load and create.
                    Err(SyncStoreError::GenerationConflict) => return Err(SyncError::ConcurrentRun),
                    Err(e) => return Err(e.into()),
                }
            }
        };

        if cursor.status == SyncStatus::Running && !cursor.is_stale(self.config.stale_after_secs) {
            return Err(SyncError::ConcurrentRun);
        }
        if cursor.status == SyncStatus::Running {
            info!(job, "resuming orphaned run from persisted token");
        }

        let expected = cursor.generation;
        cursor.begin();
        let generation = match self.cursors.save(&cursor, expected).await {
            Ok(generation) => generation,
            Err(SyncStoreError::GenerationConflict) => return Err(SyncError::ConcurrentRun),
            Err(e) => return Err(e.into()),
        };

        Ok((cursor, generation))
    }

    /// Fetches one page, retrying transient errors with exponential backoff.
    async fn fetch_with_retry(
        &self,
        token: Option<&str>,
    ) -> Result<crate::domain::sync::DirectoryPage, DirectoryError> {
        let mut attempt = 0u32;
        loop {
            match self.directory.fetch_page(token).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < self.config.max_fetch_retries => {
                    attempt += 1;
                    let backoff = backoff_delay(self.config.retry_backoff(), attempt);
                    warn!(attempt, error = %e, "page fetch failed, backing off");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff: base * 2^(attempt-1).
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << (attempt - 1).min(8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::directory::InMemoryDirectory;
    use crate::adapters::sync::{InMemoryCursorRepository, InMemoryUserRepository};
    use crate::domain::foundation::Timestamp;
    use crate::domain::sync::{DirectoryPage, DirectoryRecord};
    use secrecy::Secret;

    fn record(id: &str) -> DirectoryRecord {
        DirectoryRecord {
            external_id: id.to_string(),
            email: format!("{}@example.com", id),
            display_name: None,
            updated_at: Timestamp::from_unix_secs(1_700_000_000),
        }
    }

    fn pages(n: u32) -> Vec<DirectoryPage> {
        (0..n)
            .map(|i| DirectoryPage {
                records: vec![record(&format!("u{}", i))],
                next_token: if i + 1 < n {
                    Some(format!("page-{}", i + 1))
                } else {
                    None
                },
            })
            .collect()
    }

    fn config() -> SyncConfig {
        SyncConfig {
            directory_url: "https://directory.example.com".to_string(),
            directory_token: Secret::new("tok".to_string()),
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    fn engine(
        directory: Arc<InMemoryDirectory>,
        cursors: Arc<InMemoryCursorRepository>,
        users: Arc<InMemoryUserRepository>,
        config: SyncConfig,
    ) -> SyncEngine {
        SyncEngine::new(directory, cursors, users, config)
    }

    #[tokio::test]
    async fn completes_a_short_directory_in_one_run() {
        let directory = Arc::new(InMemoryDirectory::with_pages(pages(2)));
        let cursors = Arc::new(InMemoryCursorRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let engine = engine(directory, cursors.clone(), users.clone(), config());

        let outcome = engine.run("syncuser").await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                pages: 2,
                records: 2,
                skipped: 0
            }
        );

        let cursor = cursors.load("syncuser").await.unwrap().unwrap();
        assert_eq!(cursor.status, SyncStatus::Idle);
        assert!(cursor.token.is_none());
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn pauses_at_page_budget_and_resumes_exactly_at_token() {
        let directory = Arc::new(InMemoryDirectory::with_pages(pages(5)));
        let cursors = Arc::new(InMemoryCursorRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());

        let mut limited = config();
        limited.max_pages_per_run = 3;
        let engine = engine(directory.clone(), cursors.clone(), users.clone(), limited);

        let outcome = engine.run("syncuser").await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Paused {
                pages: 3,
                records: 3,
                skipped: 0
            }
        );

        // Cursor is left Running at the token after page 3.
        let mut cursor = cursors.load("syncuser").await.unwrap().unwrap();
        assert_eq!(cursor.status, SyncStatus::Running);
        assert_eq!(cursor.token.as_deref(), Some("page-3"));

        // Age the cursor past the staleness threshold so the next
        // invocation treats the run as orphaned.
        cursor.updated_at = Timestamp::now().minus_secs(700);
        let generation = cursor.generation;
        cursors.save(&cursor, generation).await.unwrap();

        let outcome = engine.run("syncuser").await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                pages: 2,
                records: 2,
                skipped: 0
            }
        );

        // The resumed run fetched pages 4 and 5 only, nothing before the
        // persisted token and nothing skipped after it.
        let fetches = directory.fetch_log();
        assert_eq!(
            fetches,
            vec![
                None,
                Some("page-1".to_string()),
                Some("page-2".to_string()),
                Some("page-3".to_string()),
                Some("page-4".to_string()),
            ]
        );
        assert_eq!(users.len(), 5);
    }

    #[tokio::test]
    async fn fresh_running_cursor_means_concurrent_run() {
        let directory = Arc::new(InMemoryDirectory::with_pages(pages(1)));
        let cursors = Arc::new(InMemoryCursorRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let engine = engine(directory, cursors.clone(), users, config());

        let mut cursor = SyncCursor::new("syncuser");
        cursor.begin();
        cursors.create(&cursor).await.unwrap();

        let err = engine.run("syncuser").await.unwrap_err();
        assert!(matches!(err, SyncError::ConcurrentRun));
    }

    #[tokio::test]
    async fn fetch_failure_sets_failed_and_preserves_token() {
        let directory = Arc::new(InMemoryDirectory::with_pages(pages(5)));
        directory.fail_page(2, DirectoryError::Malformed("bad json".to_string()));
        let cursors = Arc::new(InMemoryCursorRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let engine = engine(directory, cursors.clone(), users, config());

        let err = engine.run("syncuser").await.unwrap_err();
        assert!(matches!(err, SyncError::Failed(_)));

        let cursor = cursors.load("syncuser").await.unwrap().unwrap();
        assert_eq!(cursor.status, SyncStatus::Failed);
        // Pages 1 and 2 were persisted; the failing page 3 is next.
        assert_eq!(cursor.token.as_deref(), Some("page-2"));
    }

    #[tokio::test]
    async fn failed_run_retries_from_the_failing_page() {
        let directory = Arc::new(InMemoryDirectory::with_pages(pages(3)));
        directory.fail_page(1, DirectoryError::Malformed("bad json".to_string()));
        let cursors = Arc::new(InMemoryCursorRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let engine = engine(directory.clone(), cursors.clone(), users.clone(), config());

        assert!(engine.run("syncuser").await.is_err());
        directory.clear_failures();

        let outcome = engine.run("syncuser").await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                pages: 2,
                records: 2,
                skipped: 0
            }
        );
        assert_eq!(users.len(), 3);
    }

    #[tokio::test]
    async fn transient_fetch_errors_are_retried_with_backoff() {
        let directory = Arc::new(InMemoryDirectory::with_pages(pages(1)));
        directory.fail_page_transiently(0, 2);
        let cursors = Arc::new(InMemoryCursorRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let engine = engine(directory, cursors, users, config());

        let outcome = engine.run("syncuser").await.unwrap();
        assert!(matches!(outcome, RunOutcome::Completed { pages: 1, .. }));
    }

    #[tokio::test]
    async fn record_failure_is_skipped_not_fatal() {
        let directory = Arc::new(InMemoryDirectory::with_pages(vec![DirectoryPage {
            records: vec![record("good"), record("poison"), record("also-good")],
            next_token: None,
        }]));
        let cursors = Arc::new(InMemoryCursorRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        users.poison("poison");
        let engine = engine(directory, cursors, users.clone(), config());

        let outcome = engine.run("syncuser").await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                pages: 1,
                records: 2,
                skipped: 1
            }
        );
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn generation_conflict_aborts_the_run() {
        let directory = Arc::new(InMemoryDirectory::with_pages(pages(3)));
        let cursors = Arc::new(InMemoryCursorRepository::new());
        cursors.conflict_after(1);
        let users = Arc::new(InMemoryUserRepository::new());
        let engine = engine(directory, cursors, users, config());

        let err = engine.run("syncuser").await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Store(SyncStoreError::GenerationConflict)
        ));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(400));
    }
}
