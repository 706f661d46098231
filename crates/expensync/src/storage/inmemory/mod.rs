//! In-memory storage backend.
//!
//! Keeps every transaction in a `HashMap` behind `Arc<RwLock<_>>`. Listings
//! sort on each call, which is fine for development-sized collections.

mod repository;

pub use repository::InMemoryRepository;
