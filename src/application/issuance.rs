//! License issuance: serial generation, webhook confirmation, claiming.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::license::{generate_serial, LicenseSerial};
use crate::domain::webhook::{PurchaseEvent, WebhookError, WebhookVerifier};
use crate::ports::{SerialRepository, SerialStoreError};

/// How many serial candidates to try before giving up.
///
/// With a 36^16 keyspace a second collision in a row already indicates a
/// store defect rather than bad luck.
const MAX_ISSUE_ATTEMPTS: u32 = 5;

/// Errors surfaced by issuance.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    /// Every generated candidate collided. Operator attention required:
    /// either the alphabet is exhausted or the store is misbehaving.
    #[error("serial issuance exhausted after {0} attempts")]
    Exhausted(u32),

    /// Webhook verification or parsing failed.
    #[error(transparent)]
    Webhook(#[from] WebhookError),

    /// The serial ledger is unreachable.
    #[error("serial store unavailable: {0}")]
    Unavailable(String),
}

/// Issues and redeems license serials.
pub struct IssuanceService {
    serials: Arc<dyn SerialRepository>,
    verifier: WebhookVerifier,
}

impl IssuanceService {
    /// Creates the service over the serial ledger and a webhook verifier.
    pub fn new(serials: Arc<dyn SerialRepository>, verifier: WebhookVerifier) -> Self {
        Self { serials, verifier }
    }

    /// Issues a serial for an order.
    ///
    /// Generates a candidate and inserts it; a uniqueness violation on the
    /// serial code regenerates and retries up to [`MAX_ISSUE_ATTEMPTS`]
    /// times. A uniqueness violation on the order id means this confirmation
    /// is a replay, and the previously issued serial is returned instead.
    pub async fn issue(&self, order_id: &str) -> Result<LicenseSerial, IssuanceError> {
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let candidate = LicenseSerial::issue(generate_serial(), order_id);

            match self.serials.insert(&candidate).await {
                Ok(()) => {
                    info!(order_id, serial = %candidate.serial, "serial issued");
                    return Ok(candidate);
                }
                Err(SerialStoreError::DuplicateSerial) => {
                    warn!(order_id, attempt, "serial collision, regenerating");
                }
                Err(SerialStoreError::DuplicateOrder) => {
                    info!(order_id, "order already has a serial, returning it");
                    return self
                        .serials
                        .find_by_order(order_id)
                        .await
                        .map_err(|e| IssuanceError::Unavailable(e.to_string()))?
                        .ok_or_else(|| {
                            // The unique violation proved the row exists;
                            // not finding it means the store is inconsistent.
                            IssuanceError::Unavailable(
                                "order row vanished after duplicate".to_string(),
                            )
                        });
                }
                Err(SerialStoreError::Unavailable(e)) => {
                    return Err(IssuanceError::Unavailable(e));
                }
            }
        }

        error!(order_id, "serial issuance exhausted");
        Err(IssuanceError::Exhausted(MAX_ISSUE_ATTEMPTS))
    }

    /// Verifies a purchase webhook and issues a serial for its order.
    ///
    /// The signature is checked over the raw payload bytes as received;
    /// parsing happens only after verification succeeds.
    pub async fn confirm_purchase(
        &self,
        payload: &[u8],
        declared_signature: &str,
    ) -> Result<LicenseSerial, IssuanceError> {
        self.verifier.verify(payload, declared_signature)?;
        let event = PurchaseEvent::from_verified_payload(payload)?;
        self.issue(&event.order_id).await
    }

    /// Atomically claims a serial.
    ///
    /// Returns `false` for an unknown or already-claimed serial; both are
    /// expected concurrent-use outcomes, not faults.
    pub async fn claim(&self, serial: &str) -> Result<bool, IssuanceError> {
        self.serials
            .claim(serial)
            .await
            .map_err(|e| IssuanceError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::{Hmac, Mac};
    use secrecy::Secret;
    use sha2::Sha256;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeSerialRepository {
        rows: Mutex<HashMap<String, LicenseSerial>>,
        serial_collisions: Mutex<u32>,
    }

    impl FakeSerialRepository {
        fn new() -> Self {
            Self {
                rows: Mutex::new(HashMap::new()),
                serial_collisions: Mutex::new(0),
            }
        }

        /// Force the next `n` inserts to report a serial collision.
        fn collide_next(&self, n: u32) {
            *self.serial_collisions.lock().unwrap() = n;
        }
    }

    #[async_trait::async_trait]
    impl SerialRepository for FakeSerialRepository {
        async fn insert(&self, serial: &LicenseSerial) -> Result<(), SerialStoreError> {
            {
                let mut collisions = self.serial_collisions.lock().unwrap();
                if *collisions > 0 {
                    *collisions -= 1;
                    return Err(SerialStoreError::DuplicateSerial);
                }
            }

            let mut rows = self.rows.lock().unwrap();
            if rows.values().any(|s| s.order_id == serial.order_id) {
                return Err(SerialStoreError::DuplicateOrder);
            }
            if rows.contains_key(&serial.serial) {
                return Err(SerialStoreError::DuplicateSerial);
            }
            rows.insert(serial.serial.clone(), serial.clone());
            Ok(())
        }

        async fn find_by_order(
            &self,
            order_id: &str,
        ) -> Result<Option<LicenseSerial>, SerialStoreError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|s| s.order_id == order_id)
                .cloned())
        }

        async fn claim(&self, serial: &str) -> Result<bool, SerialStoreError> {
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(serial) {
                Some(row) if !row.claimed => {
                    row.claimed = true;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn service() -> (Arc<FakeSerialRepository>, IssuanceService) {
        let repo = Arc::new(FakeSerialRepository::new());
        let verifier = WebhookVerifier::new(Secret::new("whsec-test".to_string()));
        (repo.clone(), IssuanceService::new(repo, verifier))
    }

    #[tokio::test]
    async fn issues_distinct_serials_per_order() {
        let (_, service) = service();

        let a = service.issue("order-a").await.unwrap();
        let b = service.issue("order-b").await.unwrap();

        assert_ne!(a.serial, b.serial);
        assert!(!a.claimed);
    }

    #[tokio::test]
    async fn concurrent_issuance_yields_distinct_serials() {
        let (_, service) = service();
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for i in 0..20 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.issue(&format!("order-{}", i)).await.unwrap().serial
            }));
        }

        let mut serials = Vec::new();
        for handle in handles {
            serials.push(handle.await.unwrap());
        }
        serials.sort();
        serials.dedup();
        assert_eq!(serials.len(), 20);
    }

    #[tokio::test]
    async fn serial_collision_retries_and_succeeds() {
        let (repo, service) = service();
        repo.collide_next(2);

        let serial = service.issue("order-x").await.unwrap();
        assert_eq!(serial.order_id, "order-x");
    }

    #[tokio::test]
    async fn exhausted_after_bounded_attempts() {
        let (repo, service) = service();
        repo.collide_next(MAX_ISSUE_ATTEMPTS);

        let err = service.issue("order-x").await.unwrap_err();
        assert!(matches!(err, IssuanceError::Exhausted(n) if n == MAX_ISSUE_ATTEMPTS));
    }

    #[tokio::test]
    async fn replayed_order_returns_existing_serial() {
        let (_, service) = service();

        let first = service.issue("order-r").await.unwrap();
        let second = service.issue("order-r").await.unwrap();
        assert_eq!(first.serial, second.serial);
    }

    #[tokio::test]
    async fn confirm_purchase_verifies_then_issues() {
        let (_, service) = service();
        let payload = br#"{"order_id":"ord-77"}"#;
        let signature = sign("whsec-test", payload);

        let serial = service.confirm_purchase(payload, &signature).await.unwrap();
        assert_eq!(serial.order_id, "ord-77");
    }

    #[tokio::test]
    async fn confirm_purchase_rejects_bad_signature() {
        let (repo, service) = service();
        let payload = br#"{"order_id":"ord-77"}"#;

        let err = service
            .confirm_purchase(payload, &"0".repeat(64))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IssuanceError::Webhook(WebhookError::InvalidSignature)
        ));
        // Nothing was issued for the unverified payload.
        assert!(repo.find_by_order("ord-77").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_flips_once_then_reports_false() {
        let (_, service) = service();
        let serial = service.issue("order-c").await.unwrap();

        assert!(service.claim(&serial.serial).await.unwrap());
        assert!(!service.claim(&serial.serial).await.unwrap());
    }

    #[tokio::test]
    async fn claiming_unknown_serial_returns_false() {
        let (_, service) = service();
        assert!(!service.claim("NOSUCHSERIAL0000").await.unwrap());
    }
}
