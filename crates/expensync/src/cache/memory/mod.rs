//! In-memory cache and change feed.

mod cache;
mod feed;

pub use cache::MemoryCache;
pub use feed::MemoryChangeFeed;
