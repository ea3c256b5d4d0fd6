//! License serial codes and their generator.
//!
//! A serial is a 16-character code drawn from a fixed alphanumeric alphabet.
//! The generator is random, not collision-proof: uniqueness is enforced by the
//! serial repository's unique constraint, never by the generator alone.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::Timestamp;

/// Alphabet used for serial codes: uppercase letters and digits.
pub const SERIAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a serial code in characters.
pub const SERIAL_LENGTH: usize = 16;

/// Generates a candidate serial code.
///
/// Each character is drawn with a uniformly random index into
/// [`SERIAL_ALPHABET`]. This is a generator only; callers must rely on the
/// persistence layer to reject collisions.
pub fn generate_serial() -> String {
    let mut rng = rand::thread_rng();
    (0..SERIAL_LENGTH)
        .map(|_| SERIAL_ALPHABET[rng.gen_range(0..SERIAL_ALPHABET.len())] as char)
        .collect()
}

/// A persisted license serial in the ledger.
///
/// Created exactly once per confirmed purchase. The `claimed` flag transitions
/// false -> true exactly once and never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseSerial {
    /// Row identifier.
    pub id: Uuid,
    /// The 16-character serial code; unique in the ledger.
    pub serial: String,
    /// Order that the serial was issued for; unique in the ledger.
    pub order_id: String,
    /// Whether the serial has been redeemed.
    pub claimed: bool,
    /// When the serial was issued.
    pub created_at: Timestamp,
}

impl LicenseSerial {
    /// Creates an unclaimed serial for an order.
    pub fn issue(serial: impl Into<String>, order_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            serial: serial.into(),
            order_id: order_id.into(),
            claimed: false,
            created_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generated_serial_has_expected_length() {
        assert_eq!(generate_serial().len(), SERIAL_LENGTH);
    }

    #[test]
    fn generated_serial_uses_only_the_alphabet() {
        let serial = generate_serial();
        for b in serial.bytes() {
            assert!(SERIAL_ALPHABET.contains(&b), "unexpected character {}", b as char);
        }
    }

    #[test]
    fn consecutive_serials_differ() {
        // 36^16 keyspace; a collision here would indicate a broken generator.
        let a = generate_serial();
        let b = generate_serial();
        assert_ne!(a, b);
    }

    #[test]
    fn issued_serial_starts_unclaimed() {
        let serial = LicenseSerial::issue("ABCD1234EFGH5678", "order-42");
        assert!(!serial.claimed);
        assert_eq!(serial.order_id, "order-42");
    }

    proptest! {
        #[test]
        fn generator_always_produces_valid_codes(_seed in 0u64..64) {
            let serial = generate_serial();
            prop_assert_eq!(serial.len(), SERIAL_LENGTH);
            prop_assert!(serial.bytes().all(|b| SERIAL_ALPHABET.contains(&b)));
        }
    }
}
