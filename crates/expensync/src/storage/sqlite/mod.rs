//! SQLite storage backend.
//!
//! Uses `rusqlite` for the queries and `tokio-rusqlite` to run them off the
//! async runtime. Transactions live in one table indexed by `(date, id)`, the
//! same key the keyset pagination walks.

mod conversions;
mod error;
mod repository;
mod schema;

pub use repository::SqliteRepository;
