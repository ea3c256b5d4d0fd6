//! Issuance and webhook configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::error::ValidationError;

/// Issuance and purchase-webhook configuration
#[derive(Debug, Deserialize)]
pub struct IssuanceConfig {
    /// Shared secret for purchase webhook signatures
    pub webhook_secret: Secret<String>,

    /// Pre-shared credential for the direct serial issuance endpoint
    pub issue_token: Secret<String>,
}

impl IssuanceConfig {
    /// Validate issuance configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("ISSUANCE_WEBHOOK_SECRET"));
        }
        if self.issue_token.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("ISSUANCE_ISSUE_TOKEN"));
        }
        Ok(())
    }
}

impl Clone for IssuanceConfig {
    fn clone(&self) -> Self {
        Self {
            webhook_secret: Secret::new(self.webhook_secret.expose_secret().clone()),
            issue_token: Secret::new(self.issue_token.expose_secret().clone()),
        }
    }
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            webhook_secret: Secret::new(String::new()),
            issue_token: Secret::new(String::new()),
        }
    }
}
