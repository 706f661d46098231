//! In-memory change feed with bounded replay history.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};

use expensync_core::cache::{ChangeFeed, Result};
use expensync_core::transaction::{ChangeEvent, TransactionChange};

/// Channel capacity for live subscribers.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct FeedState {
    last_seq: u64,
    history: VecDeque<ChangeEvent>,
}

/// Change feed for a single server process.
///
/// Sequence numbers are assigned under the same lock that appends to the
/// history and broadcasts, so live subscribers and replays agree on order.
#[derive(Debug, Clone)]
pub struct MemoryChangeFeed {
    state: Arc<Mutex<FeedState>>,
    sender: broadcast::Sender<ChangeEvent>,
    max_history: usize,
}

impl MemoryChangeFeed {
    /// Creates a feed retaining at most `max_history` events for replay.
    pub fn new(max_history: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(FeedState::default())),
            sender,
            max_history,
        }
    }
}

#[async_trait]
impl ChangeFeed for MemoryChangeFeed {
    async fn publish(&self, change: TransactionChange) -> Result<ChangeEvent> {
        let mut state = self.state.lock().await;

        state.last_seq += 1;
        let event = ChangeEvent::new(state.last_seq, change);

        state.history.push_back(event.clone());
        while state.history.len() > self.max_history {
            state.history.pop_front();
        }

        // No receivers is fine: nobody is watching right now.
        let _ = self.sender.send(event.clone());

        tracing::trace!(
            seq = event.seq,
            kind = event.change.event_name(),
            transaction_id = %event.change.transaction_id(),
            "Published change"
        );
        Ok(event)
    }

    async fn subscribe(&self) -> Result<broadcast::Receiver<ChangeEvent>> {
        Ok(self.sender.subscribe())
    }

    async fn events_since(&self, seq: u64) -> Result<Option<Vec<ChangeEvent>>> {
        let state = self.state.lock().await;

        if seq >= state.last_seq {
            return Ok(Some(Vec::new()));
        }

        let oldest = match state.history.front() {
            Some(event) => event.seq,
            None => return Ok(None),
        };
        if seq + 1 < oldest {
            return Ok(None);
        }

        Ok(Some(
            state
                .history
                .iter()
                .filter(|event| event.seq > seq)
                .cloned()
                .collect(),
        ))
    }

    async fn latest_seq(&self) -> u64 {
        self.state.lock().await.last_seq
    }

    async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn removed(id: &str) -> TransactionChange {
        TransactionChange::Removed { id: id.into() }
    }

    fn seqs(events: &[ChangeEvent]) -> Vec<u64> {
        events.iter().map(|e| e.seq).collect()
    }

    #[tokio::test]
    async fn test_sequence_numbers_are_consecutive() {
        let feed = MemoryChangeFeed::new(10);

        let first = feed.publish(removed("a")).await.unwrap();
        let second = feed.publish(removed("b")).await.unwrap();

        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(feed.latest_seq().await, 2);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let feed = MemoryChangeFeed::new(10);
        let mut receiver = feed.subscribe().await.unwrap();

        feed.publish(removed("a")).await.unwrap();
        feed.publish(removed("b")).await.unwrap();

        assert_eq!(receiver.recv().await.unwrap().seq, 1);
        assert_eq!(receiver.recv().await.unwrap().seq, 2);
    }

    #[tokio::test]
    async fn test_events_since_replays_missed_events() {
        let feed = MemoryChangeFeed::new(10);
        for id in ["a", "b", "c"] {
            feed.publish(removed(id)).await.unwrap();
        }

        let replay = feed.events_since(1).await.unwrap().unwrap();
        assert_eq!(seqs(&replay), vec![2, 3]);

        let caught_up = feed.events_since(3).await.unwrap().unwrap();
        assert!(caught_up.is_empty());
    }

    #[tokio::test]
    async fn test_events_since_reports_truncated_history() {
        let feed = MemoryChangeFeed::new(2);
        for id in ["a", "b", "c", "d"] {
            feed.publish(removed(id)).await.unwrap();
        }

        assert_eq!(feed.history_len().await, 2);
        // Events 3 and 4 are retained; 2 is gone.
        assert!(feed.events_since(1).await.unwrap().is_none());
        assert_eq!(
            seqs(&feed.events_since(2).await.unwrap().unwrap()),
            vec![3, 4]
        );
    }

    #[tokio::test]
    async fn test_empty_feed_has_nothing_to_replay() {
        let feed = MemoryChangeFeed::new(10);
        assert_eq!(feed.events_since(0).await.unwrap(), Some(Vec::new()));
    }
}
