//! Incremental Server-Sent Events decoder
//!
//! Bytes arrive in arbitrary slices. Complete lines are consumed, partial
//! lines stay buffered until the next slice.

/// Payload that marks the end of an event stream
pub const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Raw bytes of the unfinished line
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every event payload completed by them.
    ///
    /// Lines are decoded only once complete, so a multi-byte character split
    /// across slices survives intact.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever is buffered once the body has ended
    pub fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&raw);
        let rest = rest.trim_end_matches(['\r', '\n']);
        if !rest.is_empty() {
            if let Some(event) = self.process_line(rest) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        // comment line
        if line.starts_with(':') {
            return None;
        }
        if let Some(data) = line.strip_prefix("data:") {
            self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}
