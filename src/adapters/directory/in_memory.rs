//! Scripted in-memory directory for tests.
//!
//! Serves a fixed sequence of pages addressed by the same continuation
//! tokens the real directory would return, records every fetch, and can be
//! told to fail specific pages permanently or transiently.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::sync::DirectoryPage;
use crate::ports::{Directory, DirectoryError};

/// In-memory directory fake.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    /// Pages by index; page `i` is addressed by token `page-{i}` (page 0 by
    /// the absent token).
    pages: Vec<DirectoryPage>,
    /// Every token this directory was asked for, in order.
    fetch_log: Mutex<Vec<Option<String>>>,
    /// Permanent failures by page index.
    failures: Mutex<HashMap<usize, String>>,
    /// Remaining transient (retryable) failures by page index.
    transient_failures: Mutex<HashMap<usize, u32>>,
}

impl InMemoryDirectory {
    /// Creates a directory serving the given pages in order.
    ///
    /// The scripted pages' `next_token` values should follow the
    /// `page-{index}` convention used by [`Self::fetch_page`].
    pub fn with_pages(pages: Vec<DirectoryPage>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    /// Returns every token fetched so far, in order.
    pub fn fetch_log(&self) -> Vec<Option<String>> {
        self.fetch_log.lock().unwrap().clone()
    }

    /// Makes fetches of page `index` fail permanently with `error`.
    pub fn fail_page(&self, index: usize, error: DirectoryError) {
        self.failures
            .lock()
            .unwrap()
            .insert(index, error.to_string());
    }

    /// Makes the next `times` fetches of page `index` fail with a
    /// retryable error.
    pub fn fail_page_transiently(&self, index: usize, times: u32) {
        self.transient_failures.lock().unwrap().insert(index, times);
    }

    /// Clears all scripted failures.
    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
        self.transient_failures.lock().unwrap().clear();
    }

    fn index_for(token: Option<&str>) -> Result<usize, DirectoryError> {
        match token {
            None => Ok(0),
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| DirectoryError::Malformed(format!("unknown token {}", token))),
        }
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn fetch_page(&self, token: Option<&str>) -> Result<DirectoryPage, DirectoryError> {
        self.fetch_log
            .lock()
            .unwrap()
            .push(token.map(str::to_string));

        let index = Self::index_for(token)?;

        {
            let mut transient = self.transient_failures.lock().unwrap();
            if let Some(remaining) = transient.get_mut(&index) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(DirectoryError::Unavailable("transient".to_string()));
                }
            }
        }

        if let Some(message) = self.failures.lock().unwrap().get(&index) {
            return Err(DirectoryError::Malformed(message.clone()));
        }

        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| DirectoryError::Malformed(format!("no page at index {}", index)))
    }
}
