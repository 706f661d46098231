//! Functional core of expensync.
//!
//! Domain types, normalization of legacy data, aggregates, merge and
//! ordering rules, and the traits implemented by storage backends and caches.
//! Nothing in this crate performs I/O.

pub mod cache;
pub mod format;
pub mod normalize;
pub mod serde;
pub mod storage;
pub mod sync;
pub mod transaction;
