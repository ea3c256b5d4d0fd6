//! External directory adapters.

mod http;
mod in_memory;

pub use http::HttpDirectory;
pub use in_memory::InMemoryDirectory;
