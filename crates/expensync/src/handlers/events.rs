//! SSE endpoint streaming transaction changes.
//!
//! A client reconnecting with `last_event_id` first receives the retained
//! events after that id, then live events. When the retained history no
//! longer reaches back that far, a `resync` event tells the client to reload.

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use tokio::sync::broadcast;

use expensync_core::transaction::ChangeEvent;

use crate::state::AppState;

/// SSE event name telling the client to reload its state.
pub const RESYNC_EVENT: &str = "resync";

/// Query parameters for the SSE events endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// Last event ID received (for reconnection catch-up).
    pub last_event_id: Option<u64>,
}

fn change_event(event: &ChangeEvent) -> Event {
    Event::default()
        .id(event.seq.to_string())
        .event(event.change.event_name())
        .data(serde_json::to_string(event).unwrap_or_default())
}

fn resync_event(latest_seq: u64) -> Event {
    Event::default()
        .event(RESYNC_EVENT)
        .data(serde_json::json!({ "latest_seq": latest_seq }).to_string())
}

/// SSE endpoint for transaction changes (GET /api/events).
pub async fn events_sse(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let mut shutdown_rx = state.subscribe_shutdown();
    let feed = state.change_feed.clone();

    let stream = async_stream::stream! {
        // Subscribe before reading history so nothing falls between the two.
        let mut receiver = match feed.subscribe().await {
            Ok(receiver) => receiver,
            Err(err) => {
                tracing::error!(error = %err, "Failed to subscribe to change feed");
                return;
            }
        };

        let mut last_sent = query.last_event_id.unwrap_or(0);

        if let Some(since) = query.last_event_id {
            match feed.events_since(since).await {
                Ok(Some(missed)) => {
                    tracing::debug!(since, count = missed.len(), "Replaying missed events");
                    for event in missed {
                        last_sent = event.seq;
                        yield Ok(change_event(&event));
                    }
                }
                Ok(None) => {
                    let latest = feed.latest_seq().await;
                    tracing::info!(since, latest, "Event history truncated, requesting resync");
                    last_sent = latest;
                    yield Ok(resync_event(latest));
                }
                Err(err) => {
                    tracing::error!(since, error = %err, "Failed to read event history");
                    return;
                }
            }
        }

        loop {
            tokio::select! {
                result = receiver.recv() => {
                    match result {
                        Ok(event) if event.seq <= last_sent => {
                            tracing::trace!(seq = event.seq, "Skipping already replayed event");
                        }
                        Ok(event) => {
                            last_sent = event.seq;
                            yield Ok(change_event(&event));
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            let latest = feed.latest_seq().await;
                            tracing::warn!(skipped, latest, "SSE subscriber lagged, requesting resync");
                            last_sent = latest;
                            yield Ok(resync_event(latest));
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Change feed closed");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("SSE session received shutdown signal");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
