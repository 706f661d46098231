//! Ordering rules for applying realtime events.
//!
//! Events carry consecutive sequence numbers. A subscriber applies each one
//! exactly once and in order; anything else is either a duplicate (already
//! applied, e.g. replayed after a reconnect) or a gap (events were missed and
//! local state can no longer be patched incrementally).

/// Decision for an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    /// Next in line; apply it.
    Apply,
    /// Already applied; drop it.
    Duplicate,
    /// Events between the last applied one and this one are missing.
    Gap { expected: u64, received: u64 },
}

/// Classifies event `seq` given the last applied sequence number.
///
/// With no event applied yet, any sequence number is accepted as the
/// starting point.
pub fn check_sequence(last_applied: Option<u64>, seq: u64) -> SequenceCheck {
    match last_applied {
        None => SequenceCheck::Apply,
        Some(last) if seq <= last => SequenceCheck::Duplicate,
        Some(last) if seq == last + 1 => SequenceCheck::Apply,
        Some(last) => SequenceCheck::Gap {
            expected: last + 1,
            received: seq,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_event_is_applied() {
        assert_eq!(check_sequence(None, 42), SequenceCheck::Apply);
    }

    #[test]
    fn test_next_event_is_applied() {
        assert_eq!(check_sequence(Some(4), 5), SequenceCheck::Apply);
    }

    #[test]
    fn test_replayed_event_is_duplicate() {
        assert_eq!(check_sequence(Some(4), 4), SequenceCheck::Duplicate);
        assert_eq!(check_sequence(Some(4), 1), SequenceCheck::Duplicate);
    }

    #[test]
    fn test_skipped_event_is_gap() {
        assert_eq!(
            check_sequence(Some(4), 7),
            SequenceCheck::Gap {
                expected: 5,
                received: 7
            }
        );
    }
}
