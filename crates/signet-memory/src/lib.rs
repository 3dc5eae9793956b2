//! # signet-memory
//!
//! HashMap-backed [`Storage`](signet_core::Storage) implementation. All
//! data lives behind one `tokio::sync::RwLock` and is lost on drop; use it
//! for development servers and the test suites.

mod store;

pub use store::MemoryStorage;
