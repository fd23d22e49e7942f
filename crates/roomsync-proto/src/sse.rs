//! Incremental `text/event-stream` decoder.
//!
//! The push channel delivers arbitrary byte chunks; an event may span several
//! chunks and a chunk may carry several events. [`EventStreamDecoder`] buffers
//! partial lines and yields complete [`ServerEvent`]s as soon as their
//! terminating blank line arrives.
//!
//! Only the subset of the format the backend uses is interpreted (`data`,
//! `event`, `id`, comments). `retry` and unknown fields are ignored.

use bytes::{Buf, BytesMut};

use crate::errors::{ProtocolError, Result};

/// A dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    /// Event type, `None` for the default `message` type.
    pub event: Option<String>,
    /// Concatenated `data` lines joined with `\n`.
    pub data: String,
    /// Last event id, if any was sent.
    pub id: Option<String>,
}

/// Streaming decoder state.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: BytesMut,
    data: Vec<String>,
    event: Option<String>,
    last_id: Option<String>,
    /// A `\r` ended the previous chunk; a leading `\n` belongs to it.
    pending_cr: bool,
}

impl EventStreamDecoder {
    /// Longest line accepted before the buffer is discarded.
    pub const MAX_LINE: usize = 1024 * 1024;

    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completes.
    ///
    /// On [`ProtocolError::LineTooLong`] the oversized line and any partially
    /// assembled event are discarded; the decoder stays usable.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<ServerEvent>> {
        let mut chunk = chunk;
        if self.pending_cr && !chunk.is_empty() {
            self.pending_cr = false;
            if let Some(rest) = chunk.strip_prefix(b"\n") {
                chunk = rest;
            }
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n' || b == b'\r') {
            let line = self.buffer.split_to(end);
            let terminator = self.buffer[0];
            self.buffer.advance(1);
            if terminator == b'\r' {
                match self.buffer.first() {
                    Some(b'\n') => self.buffer.advance(1),
                    Some(_) => {},
                    None => self.pending_cr = true,
                }
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        if self.buffer.len() > Self::MAX_LINE {
            self.buffer.clear();
            self.data.clear();
            self.event = None;
            return Err(ProtocolError::LineTooLong { limit: Self::MAX_LINE });
        }

        Ok(events)
    }

    fn process_line(&mut self, line: &str) -> Option<ServerEvent> {
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
            "data" => self.data.push(value.to_owned()),
            "event" => self.event = Some(value.to_owned()),
            "id" => self.last_id = Some(value.to_owned()),
            _ => {},
        }
        None
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(ServerEvent { event, data, id: self.last_id.clone() })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut decoder = EventStreamDecoder::new();
        let events = decoder.feed(b"data: {\"a\":1}\n\n").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"a\":1}");
        assert_eq!(events[0].event, None);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut decoder = EventStreamDecoder::new();
        assert!(decoder.feed(b"data: {\"sal").unwrap().is_empty());
        assert!(decoder.feed(b"on\":2}\n").unwrap().is_empty());
        let events = decoder.feed(b"\n").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"salon\":2}");
    }

    #[test]
    fn multiple_events_and_comments() {
        let mut decoder = EventStreamDecoder::new();
        let events = decoder
            .feed(b": keepalive\n\nevent: update\nid: 7\ndata: one\ndata: two\n\ndata: three\n\n")
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.as_deref(), Some("update"));
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(events[0].data, "one\ntwo");
        assert_eq!(events[1].event, None);
        assert_eq!(events[1].id.as_deref(), Some("7"));
    }

    #[test]
    fn crlf_split_between_chunks() {
        let mut decoder = EventStreamDecoder::new();
        assert!(decoder.feed(b"data: x\r").unwrap().is_empty());
        let events = decoder.feed(b"\n\r\n").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn oversized_line_is_discarded() {
        let mut decoder = EventStreamDecoder::new();
        let big = vec![b'a'; EventStreamDecoder::MAX_LINE + 1];

        assert!(matches!(decoder.feed(&big), Err(ProtocolError::LineTooLong { .. })));
        let events = decoder.feed(b"data: ok\n\n").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "ok");
    }
}
