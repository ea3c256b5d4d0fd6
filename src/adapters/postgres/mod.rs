//! PostgreSQL persistence adapters.

mod directory_user_repository;
mod serial_repository;
mod sync_cursor_repository;

pub use directory_user_repository::PostgresDirectoryUserRepository;
pub use serial_repository::PostgresSerialRepository;
pub use sync_cursor_repository::PostgresSyncCursorRepository;
