//! Batch synchronization configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Batch synchronization configuration
#[derive(Debug, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the external user directory API
    pub directory_url: String,

    /// Bearer token for the directory API
    pub directory_token: Secret<String>,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Soft wall-clock budget for one run, in seconds
    #[serde(default = "default_time_budget")]
    pub time_budget_secs: u64,

    /// Hard cap on pages per run
    #[serde(default = "default_max_pages")]
    pub max_pages_per_run: u32,

    /// Per-fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Retries per page fetch before the run fails
    #[serde(default = "default_fetch_retries")]
    pub max_fetch_retries: u32,

    /// Base backoff between fetch retries, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Age after which a `running` cursor counts as orphaned, in seconds
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Scheduler cadence, in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl SyncConfig {
    /// Soft run budget as Duration
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    /// Per-fetch timeout as Duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Base retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Scheduler cadence as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate sync configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.directory_url.is_empty() {
            return Err(ValidationError::MissingRequired("SYNC_DIRECTORY_URL"));
        }
        if !self.directory_url.starts_with("http://") && !self.directory_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidDirectoryUrl);
        }
        if self.page_size == 0 || self.page_size > 1000 {
            return Err(ValidationError::InvalidPageSize);
        }
        if self.time_budget_secs == 0 || self.time_budget_secs >= self.interval_secs {
            return Err(ValidationError::InvalidTimeBudget);
        }
        Ok(())
    }
}

impl Clone for SyncConfig {
    fn clone(&self) -> Self {
        use secrecy::ExposeSecret;
        Self {
            directory_url: self.directory_url.clone(),
            directory_token: Secret::new(self.directory_token.expose_secret().clone()),
            page_size: self.page_size,
            time_budget_secs: self.time_budget_secs,
            max_pages_per_run: self.max_pages_per_run,
            fetch_timeout_secs: self.fetch_timeout_secs,
            max_fetch_retries: self.max_fetch_retries,
            retry_backoff_ms: self.retry_backoff_ms,
            stale_after_secs: self.stale_after_secs,
            interval_secs: self.interval_secs,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            directory_url: String::new(),
            directory_token: Secret::new(String::new()),
            page_size: default_page_size(),
            time_budget_secs: default_time_budget(),
            max_pages_per_run: default_max_pages(),
            fetch_timeout_secs: default_fetch_timeout(),
            max_fetch_retries: default_fetch_retries(),
            retry_backoff_ms: default_backoff_ms(),
            stale_after_secs: default_stale_after(),
            interval_secs: default_interval(),
        }
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_time_budget() -> u64 {
    300
}

fn default_max_pages() -> u32 {
    50
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_fetch_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_stale_after() -> u64 {
    600
}

fn default_interval() -> u64 {
    1800
}
