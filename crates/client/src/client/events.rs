//! SSE change feed.

use async_trait::async_trait;

use expensync_core::storage::{self, ChangeSource, ChangeStream, RepositoryError};
use expensync_core::transaction::{ChangeEvent, FeedMessage};

use super::ExpensyncClient;
use crate::error::{ClientError, Result};

/// Event name the server uses to ask for a full reload.
pub const RESYNC_EVENT: &str = "resync";

/// One parsed SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

/// Parse one SSE frame (the text between two blank lines).
///
/// Comment lines (keep-alives) are skipped. Returns `None` for a frame with
/// no fields.
pub fn parse_sse_event(frame: &str) -> Option<SseFrame> {
    let mut parsed = SseFrame::default();
    let mut data_lines = Vec::new();
    let mut seen = false;

    for line in frame.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => parsed.event = Some(value.to_string()),
            "id" => parsed.id = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => continue,
        }
        seen = true;
    }

    if !seen {
        return None;
    }
    parsed.data = data_lines.join("\n");
    Some(parsed)
}

/// Splits an SSE byte stream into frames.
///
/// Bytes are buffered until a blank line closes the frame, so a character
/// split across network chunks is decoded whole.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the frames it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            match String::from_utf8(raw) {
                Ok(text) => frames.extend(parse_sse_event(&text)),
                Err(err) => tracing::warn!(error = %err, "Skipping SSE frame that is not UTF-8"),
            }
        }
        frames
    }
}

/// Turn a frame into a feed message.
pub fn frame_to_message(frame: &SseFrame) -> Result<FeedMessage> {
    if frame.event.as_deref() == Some(RESYNC_EVENT) {
        return Ok(FeedMessage::Resync);
    }
    let event: ChangeEvent = serde_json::from_str(&frame.data)
        .map_err(|e| ClientError::SseParse(format!("bad change event: {e}")))?;
    Ok(FeedMessage::Change(event))
}

impl ExpensyncClient {
    /// Open the SSE feed, optionally resuming after `last_event_id`.
    pub async fn watch_events(&self, last_event_id: Option<u64>) -> Result<ChangeStream> {
        let mut request = self
            .client
            .get(self.url("/api/events"))
            .header("Accept", "text/event-stream");
        if let Some(id) = last_event_id {
            request = request.query(&[("last_event_id", id)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response, None).await);
        }

        let stream = async_stream::stream! {
            use tokio_stream::StreamExt;

            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(RepositoryError::ConnectionFailed(e.to_string()));
                        break;
                    }
                };

                for frame in decoder.push(&chunk) {
                    match frame_to_message(&frame) {
                        Ok(message) => yield Ok(message),
                        Err(err) => {
                            tracing::warn!(error = %err, "Skipping malformed SSE frame");
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl ChangeSource for ExpensyncClient {
    async fn subscribe_changes(&self, since: Option<u64>) -> storage::Result<ChangeStream> {
        Ok(self.watch_events(since).await?)
    }
}
