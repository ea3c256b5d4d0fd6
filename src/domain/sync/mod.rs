//! Batch synchronization domain: cursor state machine and directory records.

mod cursor;
mod record;

pub use cursor::{SyncCursor, SyncStatus};
pub use record::{DirectoryPage, DirectoryRecord};
