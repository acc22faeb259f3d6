//! Incremental Server-Sent Events decoding.
//!
//! Network chunks do not line up with events: one chunk may carry several
//! events, and one event (or one UTF-8 sequence) may be split across chunks.
//! [`SseDecoder`] buffers bytes until a full line is available and emits the
//! joined `data` of each event when its terminating blank line arrives.
//! Lines are terminated by `\n` or `\r\n`.
//!
//! Memory is bounded by `max_frame_bytes`: a line or an event's joined data
//! that grows past it is discarded and decoding resumes at the next event.

use bytes::BytesMut;
use tracing::warn;

use tracker_core::defaults::CLIENT_MAX_FRAME_BYTES;
use tracker_core::logging::{COMPONENT_DECODER, SUBSYSTEM_CLIENT};

#[derive(Debug)]
pub struct SseDecoder {
    buf: BytesMut,
    /// Prefix of `buf` already known to hold no line terminator.
    scanned: usize,
    data: Vec<String>,
    data_len: usize,
    max_frame_bytes: usize,
    /// Dropping the remainder of an oversized line.
    skip_line: bool,
    /// Dropping data lines until the current event ends.
    skip_event: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_frame_bytes(CLIENT_MAX_FRAME_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            data: Vec::new(),
            data_len: 0,
            max_frame_bytes: max_frame_bytes.max(1),
            skip_line: false,
            skip_event: false,
        }
    }

    /// Feed one chunk. Returns the data payload of every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        loop {
            let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') else {
                self.scanned = self.buf.len();
                if self.buf.len() > self.max_frame_bytes {
                    self.discard_event(self.buf.len());
                    self.buf.clear();
                    self.scanned = 0;
                    self.skip_line = true;
                }
                break;
            };

            let pos = self.scanned + offset;
            let raw = self.buf.split_to(pos + 1);
            self.scanned = 0;
            if std::mem::take(&mut self.skip_line) {
                continue;
            }

            let mut line = &raw[..pos];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            if let Some(payload) = self.process_line(&String::from_utf8_lossy(line)) {
                events.push(payload);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if std::mem::take(&mut self.skip_event) || self.data.is_empty() {
                return None;
            }
            self.data_len = 0;
            return Some(std::mem::take(&mut self.data).join("\n"));
        }

        // Comment (keepalive)
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        // `event`, `id` and `retry` carry nothing this client uses.
        if field == "data" && !self.skip_event {
            self.data_len += value.len() + 1;
            if self.data_len > self.max_frame_bytes {
                self.discard_event(self.data_len);
            } else {
                self.data.push(value.to_string());
            }
        }
        None
    }

    /// Drop the event being assembled; its remaining lines are ignored.
    fn discard_event(&mut self, size: usize) {
        warn!(
            subsystem = SUBSYSTEM_CLIENT,
            component = COMPONENT_DECODER,
            size,
            limit = self.max_frame_bytes,
            "Discarding oversized realtime frame"
        );
        self.data.clear();
        self.data_len = 0;
        self.skip_event = true;
    }
}
