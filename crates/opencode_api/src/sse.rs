use std::io::{self, BufRead, BufReader, Read};

/// Initial read buffer size. Lines longer than this grow the line buffer instead
/// of failing, so there is no ceiling on event size.
pub const INITIAL_BUFFER_CAPACITY: usize = 1024 * 1024;

/// One decoded server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    kind: String,
    payload: Vec<u8>,
}

impl SseEvent {
    pub fn new(kind: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }

    /// Value of the last `event:` field, empty for anonymous events.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Every `data:` value of the event, each followed by `\n`.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Pull-based SSE decoder over any byte stream.
///
/// Only a blank line terminates an event. A partial event left at end of stream
/// is dropped, and a read error stops decoding for good: the error stays
/// available through [`SseDecoder::last_error`] and no partial event is
/// emitted. The decoder is single-consumer; it is not meant to be shared.
#[derive(Debug)]
pub struct SseDecoder<R> {
    reader: Option<BufReader<R>>,
    line: Vec<u8>,
    current: SseEvent,
    error: Option<io::Error>,
}

impl<R: Read> SseDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(INITIAL_BUFFER_CAPACITY, reader)
    }

    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            reader: Some(BufReader::with_capacity(capacity, reader)),
            line: Vec::new(),
            current: SseEvent::default(),
            error: None,
        }
    }

    /// Decodes the next event. Returns `false` at end of stream, after a read
    /// error, or once the decoder has been closed.
    pub fn advance(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        let Some(reader) = self.reader.as_mut() else {
            return false;
        };

        let mut kind = String::new();
        let mut data = Vec::new();

        loop {
            self.line.clear();
            match reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return false,
                Ok(_) => {}
                Err(error) => {
                    self.error = Some(error);
                    return false;
                }
            }

            let line = trim_line_end(&self.line);

            if line.is_empty() {
                if !kind.is_empty() || !data.is_empty() {
                    self.current = SseEvent {
                        kind,
                        payload: data,
                    };
                    return true;
                }
                continue;
            }

            if line[0] == b':' {
                continue;
            }

            let Some((name, value)) = split_field(line) else {
                continue;
            };

            match name {
                b"event" => kind = String::from_utf8_lossy(value).into_owned(),
                b"data" => {
                    data.extend_from_slice(value);
                    data.push(b'\n');
                }
                _ => {}
            }
        }
    }

    /// The event produced by the last successful [`SseDecoder::advance`].
    pub fn current(&self) -> &SseEvent {
        &self.current
    }

    pub fn take_current(&mut self) -> SseEvent {
        std::mem::take(&mut self.current)
    }

    pub fn last_error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    /// Drops the underlying reader. Later calls to `advance` return `false`.
    pub fn close(&mut self) {
        self.reader = None;
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &line[..end]
}

fn split_field(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let colon = line.iter().position(|byte| *byte == b':')?;
    let name = &line[..colon];
    let value = &line[colon + 1..];
    let value = value.strip_prefix(b" ").unwrap_or(value);
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{split_field, trim_line_end, SseDecoder};

    #[test]
    fn trim_line_end_strips_any_mix_of_cr_and_lf() {
        assert_eq!(trim_line_end(b"data: x\r\n"), b"data: x");
        assert_eq!(trim_line_end(b"data: x\n\r\n"), b"data: x");
        assert_eq!(trim_line_end(b"\r\n"), b"");
    }

    #[test]
    fn split_field_strips_only_one_leading_space() {
        assert_eq!(
            split_field(b"data:  two"),
            Some((&b"data"[..], &b" two"[..]))
        );
        assert_eq!(split_field(b"data:none"), Some((&b"data"[..], &b"none"[..])));
        assert_eq!(split_field(b"no colon here"), None);
    }

    #[test]
    fn tiny_buffer_still_decodes_long_lines() {
        let payload = format!("data: {}\n\n", "y".repeat(4096));
        let mut decoder = SseDecoder::with_capacity(8, Cursor::new(payload.into_bytes()));

        assert!(decoder.advance());
        assert_eq!(decoder.current().payload().len(), 4097);
        assert!(!decoder.advance());
    }
}
