//! License serial ledger port.

use async_trait::async_trait;

use crate::domain::license::LicenseSerial;

/// Port for the durable license serial ledger.
///
/// Uniqueness of both the serial code and the order id is enforced here, by
/// the persistence layer's unique constraints; the serial generator's
/// randomness is never trusted alone.
#[async_trait]
pub trait SerialRepository: Send + Sync {
    /// Inserts a new serial row.
    ///
    /// # Errors
    ///
    /// - `DuplicateSerial` - the serial code already exists (regenerate)
    /// - `DuplicateOrder` - a serial was already issued for this order
    async fn insert(&self, serial: &LicenseSerial) -> Result<(), SerialStoreError>;

    /// Looks up the serial issued for an order, if any.
    async fn find_by_order(&self, order_id: &str) -> Result<Option<LicenseSerial>, SerialStoreError>;

    /// Atomically transitions `claimed` from false to true.
    ///
    /// Returns `false` if the serial does not exist or was already claimed.
    /// Both are expected concurrent-use outcomes, not faults.
    async fn claim(&self, serial: &str) -> Result<bool, SerialStoreError>;
}

/// Errors surfaced by the serial ledger.
#[derive(Debug, thiserror::Error)]
pub enum SerialStoreError {
    /// Unique constraint violation on the serial code.
    #[error("serial already exists")]
    DuplicateSerial,

    /// Unique constraint violation on the order id.
    #[error("order already has a serial")]
    DuplicateOrder,

    /// The persistence layer is unreachable or failed.
    #[error("serial store unavailable: {0}")]
    Unavailable(String),
}
