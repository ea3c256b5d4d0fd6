//! External user directory port.

use async_trait::async_trait;

use crate::domain::sync::DirectoryPage;

/// Port for the paginated external user directory.
///
/// The directory is scanned strictly in the order it returns pages; the
/// continuation token from each page is the only valid input for the next
/// fetch. Implementations must bound each fetch with a timeout.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetches one page of records.
    ///
    /// `token` is `None` for the first page of a scan, otherwise the
    /// `next_token` of the previously fetched page.
    async fn fetch_page(&self, token: Option<&str>) -> Result<DirectoryPage, DirectoryError>;
}

/// Errors surfaced by directory fetches.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The directory endpoint is unreachable or returned an error status.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// The fetch exceeded its deadline.
    #[error("directory fetch timed out")]
    Timeout,

    /// The response body could not be parsed as a directory page.
    #[error("directory response malformed: {0}")]
    Malformed(String),
}

impl DirectoryError {
    /// True if retrying the same fetch may succeed.
    ///
    /// Malformed responses are deterministic for a given page and never
    /// recover by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DirectoryError::Unavailable(_) | DirectoryError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_and_timeout_are_retryable() {
        assert!(DirectoryError::Unavailable("503".to_string()).is_retryable());
        assert!(DirectoryError::Timeout.is_retryable());
    }

    #[test]
    fn malformed_is_not_retryable() {
        assert!(!DirectoryError::Malformed("bad json".to_string()).is_retryable());
    }
}
