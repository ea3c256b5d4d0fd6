//! Sync cursor: persisted checkpoint for a paginated reconciliation job.
//!
//! One cursor row exists per job name. A run loads the cursor, claims it by
//! writing `Running`, persists it after every page, and releases it by writing
//! `Idle` (complete) or `Failed`. Every persisted write bumps the generation
//! counter via compare-and-swap, so a run that lost the cursor to a concurrent
//! run aborts instead of clobbering its progress.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Status of a sync job's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No run in progress; a completed scan also returns here.
    Idle,
    /// A run holds the cursor, or an interrupted run left it behind.
    Running,
    /// The last run aborted on a page failure; the token points at the
    /// page to retry.
    Failed,
}

impl SyncStatus {
    /// Returns the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Running => "running",
            SyncStatus::Failed => "failed",
        }
    }

    /// Parses a stored status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(SyncStatus::Idle),
            "running" => Some(SyncStatus::Running),
            "failed" => Some(SyncStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted checkpoint for one sync job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCursor {
    /// Job name; one cursor row per job.
    pub job: String,
    /// Opaque continuation token for the external directory. `None` means
    /// the scan starts (or restarts) from the beginning.
    pub token: Option<String>,
    /// Current status.
    pub status: SyncStatus,
    /// Monotonically increasing write counter; CAS guard for every persist.
    pub generation: i64,
    /// When the cursor was last persisted.
    pub updated_at: Timestamp,
}

impl SyncCursor {
    /// Creates a fresh idle cursor for a job.
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            token: None,
            status: SyncStatus::Idle,
            generation: 0,
            updated_at: Timestamp::now(),
        }
    }

    /// Marks the cursor as claimed by a run.
    ///
    /// An `Idle` cursor starts a fresh scan from the beginning; `Running`
    /// (orphaned) and `Failed` cursors keep their token so the run resumes
    /// at the exact page the previous invocation last persisted.
    pub fn begin(&mut self) {
        if self.status == SyncStatus::Idle {
            self.token = None;
        }
        self.status = SyncStatus::Running;
        self.updated_at = Timestamp::now();
    }

    /// Records a successfully reconciled page.
    pub fn advance(&mut self, next_token: Option<String>) {
        self.token = next_token;
        self.updated_at = Timestamp::now();
        if self.token.is_none() {
            // Directory exhausted; the scan is complete.
            self.status = SyncStatus::Idle;
        }
    }

    /// Marks the run as failed, preserving the token of the page to retry.
    pub fn fail(&mut self) {
        self.status = SyncStatus::Failed;
        self.updated_at = Timestamp::now();
    }

    /// True if a `Running` cursor is old enough to be treated as orphaned.
    ///
    /// A run persists the cursor after every page, so a `Running` cursor that
    /// has not been written for longer than `stale_after_secs` belongs to an
    /// invocation that was torn down mid-run.
    pub fn is_stale(&self, stale_after_secs: u64) -> bool {
        self.updated_at.age_secs() > stale_after_secs
    }
}
