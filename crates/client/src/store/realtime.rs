//! Realtime merge of the change feed into the store.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use expensync_core::storage::ChangeSource;
use expensync_core::sync::{check_sequence, SequenceCheck};
use expensync_core::transaction::{apply_change, ChangeEvent, FeedMessage, TransactionChange};

use super::{Result, TransactionStore};

impl TransactionStore {
    /// Apply one change event. Returns true if the list changed.
    ///
    /// Replayed events are dropped. A skipped sequence number means events
    /// were lost, so the whole list is reloaded instead.
    pub async fn apply_event(&self, event: ChangeEvent) -> Result<bool> {
        let last_seq = self.state.borrow().last_seq;

        match check_sequence(last_seq, event.seq) {
            SequenceCheck::Duplicate => {
                tracing::trace!(seq = event.seq, "Dropping duplicate event");
                Ok(false)
            }
            SequenceCheck::Gap { expected, received } => {
                tracing::warn!(expected, received, "Missed events, refreshing");
                self.force_refresh().await?;
                // The reloaded page already covers `received`.
                self.update_state(|s| s.last_seq = s.last_seq.max(Some(received)));
                Ok(false)
            }
            SequenceCheck::Apply => {
                let mut changed = false;
                self.state.send_if_modified(|s| {
                    s.last_seq = Some(event.seq);
                    changed = apply_change(&mut s.transactions, &event.change);
                    changed
                });
                tracing::debug!(
                    seq = event.seq,
                    transaction_id = %event.change.transaction_id(),
                    event = event.change.event_name(),
                    changed,
                    "Applied change"
                );

                match &event.change {
                    TransactionChange::Added { transaction }
                    | TransactionChange::Modified { transaction } => {
                        self.cache_put(transaction).await
                    }
                    TransactionChange::Removed { id } => self.cache_delete(id).await,
                }
                Ok(changed)
            }
        }
    }

    /// Handle one message from the change feed.
    pub async fn handle_message(&self, message: FeedMessage) -> Result<()> {
        match message {
            FeedMessage::Change(event) => {
                self.apply_event(event).await?;
            }
            FeedMessage::Resync => {
                tracing::info!("Change feed asked for a resync");
                self.force_refresh().await?;
            }
        }
        Ok(())
    }

    /// Follow `source` in the background until `shutdown` fires.
    ///
    /// Subscribes from the feed position of the loaded list, so changes made
    /// between loading and subscribing are replayed. After a disconnect the
    /// task waits `reconnect_delay` and resubscribes from the last applied
    /// sequence number.
    pub fn spawn_realtime(
        self: Arc<Self>,
        source: Arc<dyn ChangeSource>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let since = self.state.borrow().last_seq;

                let subscribed = tokio::select! {
                    _ = shutdown.recv() => break,
                    result = source.subscribe_changes(since) => result,
                };

                match subscribed {
                    Ok(mut stream) => {
                        tracing::info!(?since, "Subscribed to change feed");
                        loop {
                            tokio::select! {
                                _ = shutdown.recv() => {
                                    tracing::info!("Stopping realtime updates");
                                    return;
                                }
                                item = stream.next() => match item {
                                    Some(Ok(message)) => {
                                        if let Err(err) = self.handle_message(message).await {
                                            tracing::warn!(error = %err, "Failed to apply change");
                                        }
                                    }
                                    Some(Err(err)) => {
                                        tracing::warn!(error = %err, "Change feed error");
                                        break;
                                    }
                                    None => {
                                        tracing::info!("Change feed closed");
                                        break;
                                    }
                                },
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to subscribe to change feed");
                    }
                }

                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                }
            }
            tracing::info!("Stopping realtime updates");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use expensync_core::storage::{self, ChangeStream};

    use super::super::testing::*;
    use super::*;
    use crate::cache::MemoryLocalCache;
    use expensync_core::cache::LocalCache;

    fn added(seq: u64, id: &str, day: u32) -> ChangeEvent {
        ChangeEvent::new(
            seq,
            TransactionChange::Added {
                transaction: tx(id, day),
            },
        )
    }

    fn new_store(remote: Arc<MockRemote>, cache: Arc<MemoryLocalCache>) -> Arc<TransactionStore> {
        Arc::new(TransactionStore::new(remote, cache, config(10)))
    }

    #[tokio::test]
    async fn test_events_apply_in_order_and_mirror_cache() {
        let cache = Arc::new(MemoryLocalCache::new());
        let store = new_store(MockRemote::with(vec![]), cache.clone());

        assert!(store.apply_event(added(1, "a", 1)).await.unwrap());
        assert!(store.apply_event(added(2, "b", 2)).await.unwrap());
        let removed = ChangeEvent::new(3, TransactionChange::Removed { id: "a".into() });
        assert!(store.apply_event(removed).await.unwrap());

        assert_eq!(ids(&store.transactions()), vec!["b"]);
        assert_eq!(store.snapshot().last_seq, Some(3));
        assert!(cache.get(&"a".into()).await.unwrap().is_none());
        assert!(cache.get(&"b".into()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_event_is_ignored() {
        let store = new_store(MockRemote::with(vec![]), Arc::new(MemoryLocalCache::new()));
        store.apply_event(added(5, "a", 1)).await.unwrap();

        let replay = ChangeEvent::new(5, TransactionChange::Removed { id: "a".into() });
        assert!(!store.apply_event(replay).await.unwrap());
        assert_eq!(ids(&store.transactions()), vec!["a"]);
    }

    #[tokio::test]
    async fn test_added_event_does_not_duplicate_optimistic_insert() {
        let store = new_store(MockRemote::with(vec![]), Arc::new(MemoryLocalCache::new()));
        let created = store.add(tx("x", 3).to_draft()).await.unwrap();

        let echo = ChangeEvent::new(
            1,
            TransactionChange::Added {
                transaction: created.clone(),
            },
        );
        assert!(!store.apply_event(echo).await.unwrap());
        assert_eq!(store.transactions(), vec![created]);
    }

    #[tokio::test]
    async fn test_gap_triggers_refresh() {
        let remote = MockRemote::with(vec![tx("a", 1), tx("z", 9)]);
        let store = new_store(remote.clone(), Arc::new(MemoryLocalCache::new()));
        store.apply_event(added(1, "a", 1)).await.unwrap();

        assert!(!store.apply_event(added(4, "z", 9)).await.unwrap());

        assert_eq!(remote.list_calls(), 1);
        assert_eq!(ids(&store.transactions()), vec!["z", "a"]);
        assert_eq!(store.snapshot().last_seq, Some(4));
    }

    #[tokio::test]
    async fn test_resync_reloads_at_server_position() {
        let remote = MockRemote::with(vec![]);
        remote.record(TransactionChange::Added { transaction: tx("a", 1) });
        remote.record(TransactionChange::Added { transaction: tx("c", 3) });
        remote.record(TransactionChange::Removed { id: "c".into() });
        let store = new_store(remote.clone(), Arc::new(MemoryLocalCache::new()));
        store.apply_event(added(7, "b", 2)).await.unwrap();

        store.handle_message(FeedMessage::Resync).await.unwrap();

        assert_eq!(ids(&store.transactions()), vec!["a"]);
        assert_eq!(store.snapshot().last_seq, Some(3));
    }

    #[tokio::test]
    async fn test_change_between_load_and_subscribe_is_replayed() {
        let remote = MockRemote::with(vec![tx("a", 1)]);
        let store = new_store(remote.clone(), Arc::new(MemoryLocalCache::new()));
        store.load_first_page().await.unwrap();
        assert_eq!(store.snapshot().last_seq, Some(0));

        remote.record(TransactionChange::Added { transaction: tx("x", 5) });

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let mut rx = store.subscribe();
        let handle = store.clone().spawn_realtime(remote.clone(), shutdown_rx);

        tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| s.transactions.iter().any(|t| t.id.as_str() == "x")),
        )
        .await
        .unwrap()
        .unwrap();

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&store.transactions()), vec!["x", "a"]);
        assert_eq!(store.snapshot().last_seq, Some(1));
    }

    /// Feed that serves scripted messages once, then empty streams.
    struct ScriptedSource {
        script: Mutex<Option<Vec<FeedMessage>>>,
        subscriptions: Mutex<Vec<Option<u64>>>,
    }

    #[async_trait]
    impl ChangeSource for ScriptedSource {
        async fn subscribe_changes(&self, since: Option<u64>) -> storage::Result<ChangeStream> {
            self.subscriptions.lock().unwrap().push(since);
            let messages = self.script.lock().unwrap().take().unwrap_or_default();
            Ok(Box::pin(tokio_stream::iter(messages.into_iter().map(Ok::<_, storage::RepositoryError>))))
        }
    }

    #[tokio::test]
    async fn test_realtime_task_applies_and_resubscribes() {
        let store = new_store(MockRemote::with(vec![]), Arc::new(MemoryLocalCache::new()));
        let source = Arc::new(ScriptedSource {
            script: Mutex::new(Some(vec![
                FeedMessage::Change(added(1, "a", 1)),
                FeedMessage::Change(added(2, "b", 2)),
            ])),
            subscriptions: Mutex::new(Vec::new()),
        });
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let mut rx = store.subscribe();

        let handle = store.clone().spawn_realtime(source.clone(), shutdown_rx);

        tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| s.transactions.len() == 2),
        )
        .await
        .unwrap()
        .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while source.subscriptions.lock().unwrap().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        let subscriptions = source.subscriptions.lock().unwrap().clone();
        assert_eq!(subscriptions[0], None);
        assert_eq!(subscriptions[1], Some(2));
    }
}
