//! HTTP client for the external user directory.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::domain::sync::{DirectoryPage, DirectoryRecord};
use crate::ports::{Directory, DirectoryError};

/// Paginated directory client.
///
/// `GET {base_url}/users?limit={page_size}[&cursor={token}]` with a bearer
/// token; responses carry the records plus an opaque `next_cursor`.
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
    token: Secret<String>,
    page_size: u32,
}

/// Wire shape of a directory page.
#[derive(Debug, Deserialize)]
struct PageResponse {
    users: Vec<UserResponse>,
    next_cursor: Option<String>,
}

/// Wire shape of a directory user.
#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserResponse> for DirectoryRecord {
    fn from(user: UserResponse) -> Self {
        DirectoryRecord {
            external_id: user.id,
            email: user.email,
            display_name: user.name,
            updated_at: Timestamp::from_datetime(user.updated_at),
        }
    }
}

impl HttpDirectory {
    /// Creates a client with a per-fetch timeout.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Unavailable` if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        token: Secret<String>,
        page_size: u32,
        fetch_timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            page_size,
        })
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn fetch_page(&self, token: Option<&str>) -> Result<DirectoryPage, DirectoryError> {
        let url = format!("{}/users", self.base_url);

        let mut request = self
            .client
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .query(&[("limit", self.page_size.to_string())]);
        if let Some(token) = token {
            request = request.query(&[("cursor", token)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DirectoryError::Timeout
            } else {
                DirectoryError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Unavailable(format!(
                "directory returned {}",
                status
            )));
        }

        let page: PageResponse = response
            .json()
            .await
            .map_err(|e| DirectoryError::Malformed(e.to_string()))?;

        Ok(DirectoryPage {
            records: page.users.into_iter().map(DirectoryRecord::from).collect(),
            next_token: page.next_cursor,
        })
    }
}

impl std::fmt::Debug for HttpDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDirectory")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
