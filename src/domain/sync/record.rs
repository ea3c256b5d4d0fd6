//! Records returned by the external user directory.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// One user record from the external directory.
///
/// Reconciled into local state with last-write-wins upsert semantics keyed
/// by `external_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Identity of the record in the external directory.
    pub external_id: String,
    /// Primary email address.
    pub email: String,
    /// Display name, if the directory has one.
    #[serde(default)]
    pub display_name: Option<String>,
    /// When the directory last modified the record.
    pub updated_at: Timestamp,
}

/// One page of directory records plus the continuation token for the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryPage {
    /// Records in directory order.
    pub records: Vec<DirectoryRecord>,
    /// Token for the next page; `None` when the directory is exhausted.
    pub next_token: Option<String>,
}

impl DirectoryPage {
    /// True if this is the last page of the scan.
    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_without_token_is_last() {
        let page = DirectoryPage {
            records: vec![],
            next_token: None,
        };
        assert!(page.is_last());
    }

    #[test]
    fn page_with_token_is_not_last() {
        let page = DirectoryPage {
            records: vec![],
            next_token: Some("abc".to_string()),
        };
        assert!(!page.is_last());
    }
}
