//! Incremental `text/event-stream` decoding.
//!
//! Both renderers and the show-management event feed push events in the
//! server-sent events format. Bodies arrive in arbitrary chunks, so the
//! decoder buffers partial lines across calls.

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use std::time::Duration;

/// Event name used when a block carries no `event:` field
pub const DEFAULT_EVENT: &str = "message";

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Line-oriented event-stream decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of body bytes, returning every event completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    // Unlike browsers we also dispatch data-less events: renderers finish
    // with a bare `event: end`.
    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if event.is_none() && self.data.is_empty() {
            return None;
        }

        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
        })
    }
}

/// Why [`events`] stopped early
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError<E> {
    #[error("no data received within {0:?}")]
    Idle(Duration),

    #[error("{0}")]
    Body(E),
}

/// Decode a byte stream into events
///
/// `idle_timeout` bounds the wait for each body chunk, so comment lines and
/// keep-alives count as activity even when they dispatch nothing. The first
/// body error or idle timeout is yielded and ends the stream.
pub fn events<S, E>(body: S, idle_timeout: Duration) -> impl Stream<Item = Result<SseEvent, StreamError<E>>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    async_stream::stream! {
        futures_util::pin_mut!(body);
        let mut decoder = SseDecoder::new();

        loop {
            match tokio::time::timeout(idle_timeout, body.next()).await {
                Ok(Some(Ok(bytes))) => {
                    for event in decoder.feed(&bytes) {
                        yield Ok(event);
                    }
                }
                Ok(Some(Err(e))) => {
                    yield Err(StreamError::Body(e));
                    return;
                }
                Ok(None) => return,
                Err(_) => {
                    yield Err(StreamError::Idle(idle_timeout));
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, data: &str) -> SseEvent {
        SseEvent {
            event: name.to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_decodes_named_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: screen_update\ndata: AAAA\n\nevent: end\n\n");
        assert_eq!(events, vec![event("screen_update", "AAAA"), event("end", "")]);
    }

    #[test]
    fn test_handles_split_chunks_and_crlf() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: show_imm").is_empty());
        assert!(decoder.feed(b"ediately\r\ndata: {\"show_id\"").is_empty());
        let events = decoder.feed(b": 3}\r\n\r\n");
        assert_eq!(events, vec![event("show_immediately", "{\"show_id\": 3}")]);
    }

    #[test]
    fn test_joins_multiline_data_and_skips_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": ping\n\ndata: a\ndata:b\nid: 4\n\n");
        assert_eq!(events, vec![event(DEFAULT_EVENT, "a\nb")]);
    }

    #[tokio::test]
    async fn test_stream_stops_at_first_error() {
        let chunks: Vec<Result<Bytes, &str>> = vec![
            Ok(Bytes::from_static(b"event: a\n\n")),
            Err("reset"),
            Ok(Bytes::from_static(b"event: b\n\n")),
        ];

        let collected: Vec<_> = events(futures::stream::iter(chunks), Duration::from_secs(5))
            .collect()
            .await;
        assert_eq!(
            collected,
            vec![Ok(event("a", "")), Err(StreamError::Body("reset"))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_comments_keep_the_stream_alive() {
        let body = async_stream::stream! {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_secs(3)).await;
                yield Ok::<_, &str>(Bytes::from_static(b": ping\n\n"));
            }
            yield Ok(Bytes::from_static(b"event: end\n\n"));
        };

        let collected: Vec<_> = events(body, Duration::from_secs(5)).collect().await;
        assert_eq!(collected, vec![Ok(event("end", ""))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_body_times_out() {
        let body = async_stream::stream! {
            yield Ok::<_, &str>(Bytes::from_static(b"event: a\n\n"));
            tokio::time::sleep(Duration::from_secs(60)).await;
            yield Ok(Bytes::from_static(b"event: b\n\n"));
        };

        let collected: Vec<_> = events(body, Duration::from_secs(5)).collect().await;
        assert_eq!(
            collected,
            vec![
                Ok(event("a", "")),
                Err(StreamError::Idle(Duration::from_secs(5)))
            ]
        );
    }
}
