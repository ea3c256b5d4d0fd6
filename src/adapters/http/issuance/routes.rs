//! Axum router configuration for issuance endpoints.

use axum::routing::post;
use axum::Router;

use super::handlers::{claim_serial, handle_purchase_webhook, issue_serial, IssuanceAppState};

/// Create the serial ledger router.
///
/// # Routes
/// - `POST /issue` - Issue a serial (pre-shared token in `X-Issuance-Token`)
/// - `POST /claim` - Claim an issued serial
pub fn serial_routes() -> Router<IssuanceAppState> {
    Router::new()
        .route("/issue", post(issue_serial))
        .route("/claim", post(claim_serial))
}

/// Create the purchase webhook router.
///
/// Separate from the serial routes because the webhook carries its own
/// signature-based authentication.
///
/// # Routes
/// - `POST /purchase` - HMAC-verified purchase notification
pub fn webhook_routes() -> Router<IssuanceAppState> {
    Router::new().route("/purchase", post(handle_purchase_webhook))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use secrecy::Secret;

    use crate::application::IssuanceService;
    use crate::domain::webhook::WebhookVerifier;
    use crate::ports::{SerialRepository, SerialStoreError};
    use crate::domain::license::LicenseSerial;
    use async_trait::async_trait;

    struct EmptySerialRepository;

    #[async_trait]
    impl SerialRepository for EmptySerialRepository {
        async fn insert(&self, _serial: &LicenseSerial) -> Result<(), SerialStoreError> {
            Ok(())
        }

        async fn find_by_order(
            &self,
            _order_id: &str,
        ) -> Result<Option<LicenseSerial>, SerialStoreError> {
            Ok(None)
        }

        async fn claim(&self, _serial: &str) -> Result<bool, SerialStoreError> {
            Ok(false)
        }
    }

    fn test_state() -> IssuanceAppState {
        IssuanceAppState {
            issuance: Arc::new(IssuanceService::new(
                Arc::new(EmptySerialRepository),
                WebhookVerifier::new(Secret::new("test-secret".to_string())),
            )),
            issue_token: Secret::new("test-token".to_string()),
        }
    }

    #[test]
    fn serial_routes_creates_router() {
        let router = serial_routes();
        let _: Router<()> = router.with_state(test_state());
    }

    #[test]
    fn webhook_routes_creates_router() {
        let router = webhook_routes();
        let _: Router<()> = router.with_state(test_state());
    }
}
