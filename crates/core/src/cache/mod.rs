mod error;
mod expiry;
mod keys;
mod patterns;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use expiry::{is_fresh, CacheMeta, CacheSnapshot, DEFAULT_LOCAL_CACHE_TTL};
pub use keys::{transaction_key, transaction_page_key, transaction_pages_pattern};
pub use patterns::pattern_matches;
pub use serialization::{
    deserialize_page, deserialize_transaction, serialize_page, serialize_transaction,
};
pub use traits::{Cache, ChangeFeed, LocalCache};
