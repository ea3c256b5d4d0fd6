//! License serial ledger domain types.

mod serial;

pub use serial::{generate_serial, LicenseSerial, SERIAL_ALPHABET, SERIAL_LENGTH};
