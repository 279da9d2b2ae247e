use bytes::BytesMut;

/// Longest line the decoder buffers before giving up on it.
pub const MAX_LINE_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// The joined `data` payload of a completed event.
    Data(String),
    /// A line grew past [`MAX_LINE_BYTES`]. The line was dropped together with
    /// the data already gathered for its event.
    Overflow,
}

/// Incremental server-sent-events decoder.
///
/// Feed it raw body chunks; it yields the `data` payload of every completed
/// event. Multiple `data:` lines in one event are joined with `\n`. Comments
/// and other fields are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    data: Vec<String>,
    /// Dropping input up to the next newline after an overflow.
    skipping: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        loop {
            let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') else {
                if self.buffer.len() > MAX_LINE_BYTES {
                    self.buffer.clear();
                    self.overflow(&mut events);
                } else if self.skipping {
                    self.buffer.clear();
                }
                break;
            };
            let raw = self.buffer.split_to(pos + 1);
            if std::mem::take(&mut self.skipping) {
                continue;
            }
            if pos > MAX_LINE_BYTES {
                self.data.clear();
                events.push(SseEvent::Overflow);
                continue;
            }
            let mut line = &raw[..pos];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            self.process_line(line, &mut events);
        }
        events
    }

    fn overflow(&mut self, events: &mut Vec<SseEvent>) {
        if !self.skipping {
            self.skipping = true;
            self.data.clear();
            events.push(SseEvent::Overflow);
        }
    }

    fn process_line(&mut self, line: &[u8], events: &mut Vec<SseEvent>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                events.push(SseEvent::Data(self.data.join("\n")));
                self.data.clear();
            }
            return;
        }
        if line.starts_with(b":") {
            return;
        }
        if let Some(value) = line.strip_prefix(b"data:") {
            let value = value.strip_prefix(b" ").unwrap_or(value);
            self.data.push(String::from_utf8_lossy(value).into_owned());
        } else if line == b"data" {
            self.data.push(String::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(text: &str) -> SseEvent {
        SseEvent::Data(text.to_string())
    }

    #[test]
    fn yields_events_on_blank_line() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"a\":1}\n\ndata: {\"a\":2}\n\n");
        assert_eq!(events, vec![data("{\"a\":1}"), data("{\"a\":2}")]);
    }

    #[test]
    fn reassembles_events_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"da").is_empty());
        assert!(decoder.push(b"ta: {\"stat").is_empty());
        assert!(decoder.push(b"us\":\"queued\"}\r\n").is_empty());
        assert_eq!(decoder.push(b"\r\n"), vec![data("{\"status\":\"queued\"}")]);
    }

    #[test]
    fn joins_multi_line_data_and_skips_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keepalive\nevent: update\ndata: one\ndata: two\n\n");
        assert_eq!(events, vec![data("one\ntwo")]);
    }

    #[test]
    fn unterminated_event_is_held_back() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: partial\n").is_empty());
    }

    #[test]
    fn endless_line_is_reported_once_and_decoding_recovers() {
        let mut decoder = SseDecoder::new();
        let junk = vec![b'x'; MAX_LINE_BYTES / 2 + 1];
        assert!(decoder.push(b"data: ").is_empty());
        assert!(decoder.push(&junk).is_empty());
        assert_eq!(decoder.push(&junk), vec![SseEvent::Overflow]);
        assert!(decoder.push(&junk).is_empty());
        assert!(decoder.buffer.len() <= MAX_LINE_BYTES);

        let events = decoder.push(b"tail\n\ndata: ok\n\n");
        assert_eq!(events, vec![data("ok")]);
    }

    #[test]
    fn oversized_line_in_one_chunk_is_an_overflow() {
        let mut decoder = SseDecoder::new();
        let mut chunk = b"data: ".to_vec();
        chunk.extend(vec![b'x'; MAX_LINE_BYTES + 1]);
        chunk.extend_from_slice(b"\n\ndata: ok\n\n");
        assert_eq!(decoder.push(&chunk), vec![SseEvent::Overflow, data("ok")]);
    }
}
