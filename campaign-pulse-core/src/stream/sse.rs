//! Incremental decoder for `text/event-stream` bodies.
//!
//! Only the `data` field matters to us: each event's `data:` lines are joined
//! with `\n` and handed out once a blank line dispatches the event. Comments
//! and the `event`, `id` and `retry` fields are ignored.

/// Splits a chunked SSE body into event payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the body and return every event it completed.
    ///
    /// Chunks may split lines (or UTF-8 sequences) anywhere; incomplete lines
    /// are held until the next chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            if field == "data" {
                self.data.push(value.to_string());
            }
        }
        events
    }

    /// True when a partially received event is still buffered.
    pub fn has_pending(&self) -> bool {
        !self.data.is_empty() || !self.buffer.is_empty()
    }
}
