use ragchat_core::StreamEvent;
use tracing::{debug, warn};

/// Field prefix some servers put in front of each record.
const DATA_PREFIX: &str = "data:";

/// Splits a growing response body into newline-delimited records and parses
/// each complete record into a [`StreamEvent`].
///
/// Bytes are buffered until a line break arrives, so a record (or a multi-byte
/// character) split across chunk boundaries is only decoded once it is whole.
/// The trailing partial line is kept for the next [`push`](Self::push).
#[derive(Debug, Default)]
pub struct RecordDemuxer {
    buf: Vec<u8>,
    malformed: usize,
}

impl RecordDemuxer {
    /// A demuxer with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the newly-arrived bytes and return every event completed by them,
    /// in line order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buf[start..end]).into_owned();
            start = end + 1;
            if let Some(evt) = self.parse_record(&line) {
                events.push(evt);
            }
        }
        self.buf.drain(..start);

        events
    }

    /// Flush a final record that arrived without a trailing newline.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        self.parse_record(&rest)
    }

    /// Bytes held back waiting for a line break.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    /// Number of records dropped because they failed to parse.
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    fn parse_record(&mut self, line: &str) -> Option<StreamEvent> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let content = trimmed
            .strip_prefix(DATA_PREFIX)
            .map(str::trim)
            .unwrap_or(trimmed);

        if !content.starts_with('{') || !content.ends_with('}') {
            debug!(record = content, "Skipping non-object record");
            return None;
        }

        match serde_json::from_str::<serde_json::Value>(content) {
            Ok(value) => Some(StreamEvent::from_value(value)),
            Err(e) => {
                self.malformed += 1;
                warn!(error = %e, record = content, "Malformed JSON record");
                None
            }
        }
    }
}
