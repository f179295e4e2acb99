use std::char::REPLACEMENT_CHARACTER;

pub const FRAME_DELIMITER: &str = "\n\n";
pub const DATA_PREFIX: &str = "data:";

/// Splits the decoded response body into `\n\n`-terminated frames.
///
/// Bytes are decoded incrementally: a multi-byte character cut in half by a chunk
/// boundary is held back until the rest of it arrives. Text after the last delimiter
/// stays buffered until more input (or `finish`) comes in.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buffer: String,
    pending_bytes: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode(chunk);
        self.push_str(&text)
    }

    pub fn push_str(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].find(FRAME_DELIMITER) {
            frames.push(self.buffer[start..start + offset].to_string());
            start += offset + FRAME_DELIMITER.len();
        }
        self.buffer.drain(..start);
        frames
    }

    /// Drains whatever is left once the body has ended. Returns `None` when the
    /// remainder is blank.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending_bytes).into_owned();
            self.pending_bytes.clear();
            self.buffer.push_str(&tail);
        }
        let remainder = std::mem::take(&mut self.buffer);
        if remainder.trim().is_empty() {
            None
        } else {
            Some(remainder)
        }
    }

    #[cfg(test)]
    fn buffered_len(&self) -> usize {
        self.buffer.len() + self.pending_bytes.len()
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending_bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending_bytes.len());
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending_bytes[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending_bytes.len();
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending_bytes[start..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // incomplete sequence at the end, wait for the next chunk
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending_bytes.drain(..start);
        out
    }
}

/// Returns the payload of a `data:` frame with surrounding whitespace removed, or
/// `None` for comment and heartbeat frames.
pub fn data_payload(frame: &str) -> Option<&str> {
    frame.strip_prefix(DATA_PREFIX).map(str::trim)
}
