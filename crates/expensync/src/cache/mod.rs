//! Cache and change feed implementations.
//!
//! Concrete implementations of the `Cache` and `ChangeFeed` traits defined
//! in `expensync_core::cache`. A single process owns the document store, so
//! both live in memory.

pub mod memory;

pub use memory::{MemoryCache, MemoryChangeFeed};
