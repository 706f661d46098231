//! Glob matching for cache keys.
//!
//! Patterns support `*`, matching any run of characters including none.
//! There is no escaping; keys never contain a literal `*`.

/// Checks if a cache key matches a glob pattern.
///
/// # Examples
///
/// ```
/// use expensync_core::cache::pattern_matches;
///
/// assert!(pattern_matches("transaction:abc", "transaction:abc"));
/// assert!(pattern_matches("transactions:page:*", "transactions:page:50:first"));
/// assert!(pattern_matches("transactions:*:first", "transactions:page:50:first"));
/// assert!(!pattern_matches("transactions:page:*", "transaction:abc"));
/// ```
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    let pattern = pattern.as_bytes();
    let key = key.as_bytes();

    let (mut p, mut k) = (0, 0);
    // Position of the last `*` seen and the key position it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, k));
            p += 1;
        } else if p < pattern.len() && pattern[p] == key[k] {
            p += 1;
            k += 1;
        } else if let Some((star, tried)) = backtrack {
            // Let the last `*` swallow one more character.
            p = star + 1;
            k = tried + 1;
            backtrack = Some((star, tried + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
