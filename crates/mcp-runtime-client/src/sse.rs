//! Server-Sent Events ingest parsing (spec §4.6).
//!
//! Grounded on `turbomcp-transport/src/http_sse_client.rs`'s
//! `process_sse_event`: events are separated by a blank line, fields are
//! `field: value` pairs, and `data` lines accumulate (joined by `\n`) when
//! an event spans more than one `data:` line. Split out as a pure function
//! here so it can be tested without a live HTTP connection.

use serde_json::Value;

/// One parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SseError {
    #[error("SSE event data is not valid JSON: {0}")]
    InvalidJson(String),
}

impl SseEvent {
    /// Parse the event's `data` field(s) as the JSON-RPC payload they carry.
    pub fn data_as_json(&self) -> Result<Value, SseError> {
        serde_json::from_str(&self.data).map_err(|e| SseError::InvalidJson(e.to_string()))
    }
}

/// Parse one `field: value\n...` block (no trailing blank line) into an
/// [`SseEvent`]. Returns `None` if the block carried no `data` lines — the
/// SSE spec treats such blocks as comments/keep-alives, not events.
pub fn parse_event_block(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut id = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.find(':') {
            Some(pos) => (&line[..pos], line[pos + 1..].trim_start()),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data_lines.push(value),
            "id" => {
                if !value.is_empty() {
                    id = Some(value.to_string());
                }
            }
            // retry and unrecognized fields are accepted and ignored, per
            // the SSE spec's forward-compatibility rule.
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event,
        id,
        data: data_lines.join("\n"),
    })
}

/// Incrementally feeds raw bytes from an SSE stream and yields complete
/// events as they become available, buffering partial chunks across calls.
/// Events are delimited by a blank line (`\n\n`), matching the teacher's
/// byte-stream accumulation loop.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes (as received from the transport) and
    /// return every complete event it completes, in order. Incomplete
    /// trailing data is retained for the next call.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let block = self.buffer[..pos].to_string();
            self.buffer.drain(..pos + 2);
            if let Some(event) = parse_event_block(&block) {
                events.push(event);
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Seed scenario S5: SSE parse.
    #[test]
    fn s5_parses_a_single_complete_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed("event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\nid: 42\n\n");
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.event.as_deref(), Some("message"));
        assert_eq!(ev.id.as_deref(), Some("42"));
        let json = ev.data_as_json().unwrap();
        assert_eq!(json["id"], 1);
    }

    #[test]
    fn multi_line_data_is_joined_with_newline() {
        let block = "data: line one\ndata: line two";
        let event = parse_event_block(block).unwrap();
        assert_eq!(event.data, "line one\nline two");
    }

    #[test]
    fn partial_chunk_is_buffered_across_feeds() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed("event: message\ndata: {\"a\":1}").is_empty());
        let events = decoder.feed("\n\n");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn comment_only_block_yields_no_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(": keep-alive\n\n");
        assert!(events.is_empty());
    }

    #[test]
    fn multiple_events_in_one_chunk_are_all_returned() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed("data: {\"a\":1}\n\ndata: {\"a\":2}\n\n");
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn invalid_json_data_reports_an_error() {
        let event = parse_event_block("data: not json").unwrap();
        assert!(event.data_as_json().is_err());
    }
}
