//! Cache storage for response snapshots grouped in versioned namespaces.
//!
//! Two backends implement [`CacheBackend`]:
//!
//! - [`CacheDb`]: persistent SQLite storage via tokio-rusqlite, with automatic
//!   schema migrations and WAL mode
//! - [`MemoryCache`]: process-local storage, used by tests and ephemeral hosts
//!
//! Entries are keyed by a SHA-256 of request method and fragment-less URL.

pub mod backend;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;

pub use crate::Error;

pub use backend::CacheBackend;
pub use connection::CacheDb;
pub use entries::CachedResponse;
pub use memory::MemoryCache;
