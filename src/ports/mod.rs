//! Ports: interfaces at the application's I/O seams.
//!
//! Every external resource the core touches is behind one of these traits so
//! the backing implementation is swappable in tests (in-memory fakes vs. real
//! networked stores).

mod counter_store;
mod directory;
mod directory_user_repository;
mod serial_repository;
mod sync_cursor_repository;

pub use counter_store::{CounterStore, CounterStoreError};
pub use directory::{Directory, DirectoryError};
pub use directory_user_repository::DirectoryUserRepository;
pub use serial_repository::{SerialRepository, SerialStoreError};
pub use sync_cursor_repository::{SyncCursorRepository, SyncStoreError};
