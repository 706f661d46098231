use serde::{Deserialize, Serialize};

use super::types::{Transaction, TransactionId};

/// A change to the transaction collection, as pushed by the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionChange {
    Added { transaction: Transaction },
    Modified { transaction: Transaction },
    Removed { id: TransactionId },
}

impl TransactionChange {
    /// Id of the transaction this change is about.
    pub fn transaction_id(&self) -> &TransactionId {
        match self {
            TransactionChange::Added { transaction }
            | TransactionChange::Modified { transaction } => &transaction.id,
            TransactionChange::Removed { id } => id,
        }
    }

    /// Name used for the SSE `event:` field.
    pub fn event_name(&self) -> &'static str {
        match self {
            TransactionChange::Added { .. } => "added",
            TransactionChange::Modified { .. } => "modified",
            TransactionChange::Removed { .. } => "removed",
        }
    }
}

/// A change stamped with its position in the feed.
///
/// Sequence numbers start at 1 and increase by one per published change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub seq: u64,
    pub change: TransactionChange,
}

impl ChangeEvent {
    pub fn new(seq: u64, change: TransactionChange) -> Self {
        Self { seq, change }
    }
}

/// Message delivered to realtime subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    Change(ChangeEvent),
    /// The feed cannot replay what the subscriber missed; reload everything.
    Resync,
}
