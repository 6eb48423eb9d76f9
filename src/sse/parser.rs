//! Incremental SSE frame parsing.
//!
//! [`FrameParser`] owns the undecoded bytes of one connection attempt. Chunks
//! are appended with [`FrameParser::push`] and complete frames are pulled out
//! with [`FrameParser::next_frame`]; anything after the last line terminator
//! stays buffered until more bytes arrive.

use std::time::Duration;

use crate::sse::events::{SseFrame, SseLine, SseParseError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse a single SSE line (without its terminator) into its component type.
///
/// The field value starts after the first colon, with exactly one leading
/// space removed if present. A line without a colon is a field name with an
/// empty value.
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(comment) = line.strip_prefix(':') {
        return SseLine::Comment(comment.to_string());
    }

    let (name, value) = match line.split_once(':') {
        Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
        None => (line, ""),
    };

    match name {
        "data" => SseLine::Data(value.to_string()),
        "event" => SseLine::Event(value.to_string()),
        "id" => SseLine::Id(value.to_string()),
        "retry" => SseLine::Retry(value.to_string()),
        other => SseLine::Unknown(other.to_string()),
    }
}

/// Fields accumulated for the frame currently being read.
#[derive(Debug, Default)]
struct PendingFrame {
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    retry: Option<Duration>,
    /// Set once any recognized field has been seen.
    touched: bool,
}

impl PendingFrame {
    /// Apply one line; returns the finished frame when the line ends it.
    fn apply(&mut self, line: SseLine) -> Option<SseFrame> {
        match line {
            SseLine::Empty => return self.take(),
            SseLine::Data(value) => self.data.push(value),
            SseLine::Event(value) => self.event = Some(value),
            SseLine::Id(value) => {
                if !value.contains('\0') {
                    self.id = Some(value);
                }
            }
            SseLine::Retry(value) => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(millis) = value.parse::<u64>() {
                        self.retry = Some(Duration::from_millis(millis));
                    }
                }
            }
            SseLine::Comment(_) | SseLine::Unknown(_) => return None,
        }
        self.touched = true;
        None
    }

    fn take(&mut self) -> Option<SseFrame> {
        if !self.touched {
            return None;
        }
        let pending = std::mem::take(self);
        let data = if pending.data.is_empty() {
            None
        } else {
            Some(pending.data.join("\n"))
        };
        Some(SseFrame {
            event: pending.event,
            data,
            id: pending.id,
            retry: pending.retry,
        })
    }
}

/// Stateful SSE parser that accumulates bytes and emits complete frames.
///
/// Lines may end in `\n`, `\r\n` or a bare `\r`. A `\r` that ends a chunk is
/// treated as a terminator immediately; a `\n` opening the next chunk is then
/// swallowed. Lines are decoded as UTF-8 only once complete, so multi-byte
/// characters may be split across chunks freely.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Raw bytes; everything before `cursor` has been consumed
    buffer: Vec<u8>,
    cursor: usize,
    pending: PendingFrame,
    /// Previous line ended in `\r` at the very end of the buffer
    skip_lf: bool,
    /// Bytes after `cursor` already searched for a line terminator
    scanned: usize,
    bom_checked: bool,
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// Pull the next complete frame out of the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - A blank line completed a frame
    /// - `Ok(None)` - No complete frame is buffered yet
    /// - `Err(error)` - A complete line was not valid UTF-8; the line is
    ///   consumed, but the parser should be reset before further use
    pub fn next_frame(&mut self) -> Result<Option<SseFrame>, SseParseError> {
        if !self.check_bom() {
            return Ok(None);
        }

        loop {
            if self.skip_lf {
                match self.buffer.get(self.cursor) {
                    None => return Ok(None),
                    Some(b'\n') => self.cursor += 1,
                    Some(_) => {}
                }
                self.skip_lf = false;
            }

            let rest = &self.buffer[self.cursor..];
            let Some(pos) = rest[self.scanned..]
                .iter()
                .position(|b| matches!(b, b'\n' | b'\r'))
                .map(|offset| self.scanned + offset)
            else {
                self.scanned = rest.len();
                return Ok(None);
            };
            self.scanned = 0;

            let mut advance = pos + 1;
            if rest[pos] == b'\r' {
                match rest.get(pos + 1) {
                    Some(b'\n') => advance += 1,
                    Some(_) => {}
                    None => self.skip_lf = true,
                }
            }

            let line = std::str::from_utf8(&rest[..pos]).map(parse_sse_line);
            self.cursor += advance;

            match line {
                Ok(line) => {
                    if let Some(frame) = self.pending.apply(line) {
                        return Ok(Some(frame));
                    }
                }
                Err(e) => {
                    return Err(SseParseError::InvalidUtf8 {
                        valid_up_to: e.valid_up_to(),
                    })
                }
            }
        }
    }

    /// Append a chunk and collect every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>, SseParseError> {
        self.push(chunk);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Number of bytes received but not yet consumed as complete lines.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// True when fields of an unterminated frame are being held.
    pub fn has_pending_frame(&self) -> bool {
        self.pending.touched
    }

    /// Reset the parser state for a new connection attempt.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.pending = PendingFrame::default();
        self.skip_lf = false;
        self.scanned = 0;
        self.bom_checked = false;
    }

    /// Skip a leading byte-order mark. Returns false while the buffered bytes
    /// are still a prefix of one.
    fn check_bom(&mut self) -> bool {
        if self.bom_checked {
            return true;
        }
        let rest = &self.buffer[self.cursor..];
        if rest.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(rest) {
            return false;
        }
        if rest.starts_with(UTF8_BOM) {
            self.cursor += UTF8_BOM.len();
        }
        self.bom_checked = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payloads(parser: &mut FrameParser, chunk: &[u8]) -> Vec<String> {
        parser
            .feed(chunk)
            .unwrap()
            .into_iter()
            .filter_map(|frame| frame.data)
            .collect()
    }

    // Tests for parse_sse_line

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(parse_sse_line(""), SseLine::Empty);
    }

    #[test]
    fn test_parse_comment_line() {
        assert_eq!(
            parse_sse_line(": keep-alive"),
            SseLine::Comment(" keep-alive".to_string())
        );
    }

    #[test]
    fn test_parse_data_strips_single_space() {
        assert_eq!(
            parse_sse_line("data: hello"),
            SseLine::Data("hello".to_string())
        );
        assert_eq!(
            parse_sse_line("data:  two spaces"),
            SseLine::Data(" two spaces".to_string())
        );
        assert_eq!(
            parse_sse_line("data:no space"),
            SseLine::Data("no space".to_string())
        );
    }

    #[test]
    fn test_parse_data_keeps_later_colons() {
        assert_eq!(
            parse_sse_line(r#"data: {"a":1}"#),
            SseLine::Data(r#"{"a":1}"#.to_string())
        );
    }

    #[test]
    fn test_parse_field_without_colon() {
        assert_eq!(parse_sse_line("data"), SseLine::Data(String::new()));
        assert_eq!(
            parse_sse_line("bogus"),
            SseLine::Unknown("bogus".to_string())
        );
    }

    #[test]
    fn test_parse_other_fields() {
        assert_eq!(
            parse_sse_line("event: update"),
            SseLine::Event("update".to_string())
        );
        assert_eq!(parse_sse_line("id: 7"), SseLine::Id("7".to_string()));
        assert_eq!(
            parse_sse_line("retry: 3000"),
            SseLine::Retry("3000".to_string())
        );
    }

    // Tests for FrameParser

    #[test]
    fn test_single_frame() {
        let mut parser = FrameParser::new();
        assert_eq!(payloads(&mut parser, b"data: hello\n\n"), vec!["hello"]);
        assert_eq!(parser.buffered_len(), 0);
    }

    #[test]
    fn test_multiple_data_lines_join_with_newline() {
        let mut parser = FrameParser::new();
        assert_eq!(
            payloads(&mut parser, b"data: first\ndata: second\n\n"),
            vec!["first\nsecond"]
        );
    }

    #[test]
    fn test_incomplete_frame_stays_buffered() {
        let mut parser = FrameParser::new();
        assert!(payloads(&mut parser, b"data: hel").is_empty());
        assert_eq!(parser.buffered_len(), 9);
        assert!(payloads(&mut parser, b"lo\n").is_empty());
        assert!(parser.has_pending_frame());
        assert_eq!(payloads(&mut parser, b"\n"), vec!["hello"]);
        assert!(!parser.has_pending_frame());
    }

    #[test]
    fn test_long_line_in_small_chunks_is_scanned_once() {
        let mut parser = FrameParser::new();
        let payload = "x".repeat(4096);
        let line = format!("data: {}", payload);
        for chunk in line.as_bytes().chunks(3) {
            assert!(payloads(&mut parser, chunk).is_empty());
            assert_eq!(parser.scanned, parser.buffered_len());
        }
        assert_eq!(payloads(&mut parser, b"\n\n"), vec![payload]);
        assert_eq!(parser.scanned, 0);
        assert_eq!(parser.buffered_len(), 0);
    }

    #[test]
    fn test_empty_data_line_is_empty_payload() {
        let mut parser = FrameParser::new();
        assert_eq!(payloads(&mut parser, b"data:\n\n"), vec![""]);
        assert_eq!(payloads(&mut parser, b"data\ndata\n\n"), vec!["\n"]);
    }

    #[test]
    fn test_frame_without_data_has_no_payload() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"event: ping\n\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("ping"));
        assert!(frames[0].data.is_none());
    }

    #[test]
    fn test_comment_only_frame_yields_nothing() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b": heartbeat\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_blank_lines_between_frames_are_ignored() {
        let mut parser = FrameParser::new();
        assert_eq!(
            payloads(&mut parser, b"\n\n\ndata: a\n\n\n\ndata: b\n\n"),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_crlf_and_cr_terminators() {
        let mut parser = FrameParser::new();
        assert_eq!(payloads(&mut parser, b"data: a\r\n\r\n"), vec!["a"]);
        assert_eq!(payloads(&mut parser, b"data: b\r\r"), vec!["b"]);
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut parser = FrameParser::new();
        assert!(payloads(&mut parser, b"data: a\r").is_empty());
        assert_eq!(payloads(&mut parser, b"\n\r"), vec!["a"]);
        assert_eq!(payloads(&mut parser, b"\ndata: b\n\n"), vec!["b"]);
        assert_eq!(parser.buffered_len(), 0);
    }

    #[test]
    fn test_id_and_retry_fields() {
        let mut parser = FrameParser::new();
        let frames = parser
            .feed(b"id: 42\nretry: 2500\nevent: tick\ndata: x\n\n")
            .unwrap();
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("tick".to_string()),
                data: Some("x".to_string()),
                id: Some("42".to_string()),
                retry: Some(Duration::from_millis(2500)),
            }]
        );
    }

    #[test]
    fn test_invalid_retry_and_nul_id_are_ignored() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"retry: 10s\nid: a\0b\ndata: x\n\n").unwrap();
        assert_eq!(frames[0].retry, None);
        assert_eq!(frames[0].id, None);
    }

    #[test]
    fn test_leading_bom_is_skipped() {
        let mut parser = FrameParser::new();
        assert!(payloads(&mut parser, b"\xEF\xBB").is_empty());
        assert_eq!(payloads(&mut parser, b"\xBFdata: a\n\n"), vec!["a"]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut parser = FrameParser::new();
        let bytes = "data: café\n\n".as_bytes();
        let split = bytes.len() - 3;
        assert!(payloads(&mut parser, &bytes[..split]).is_empty());
        assert_eq!(payloads(&mut parser, &bytes[split..]), vec!["café"]);
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let mut parser = FrameParser::new();
        let err = parser.feed(b"data: \xFF\xFE\n\n").unwrap_err();
        assert_eq!(err, SseParseError::InvalidUtf8 { valid_up_to: 6 });
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut parser = FrameParser::new();
        assert!(payloads(&mut parser, b"data: stale\n").is_empty());
        assert!(payloads(&mut parser, b"data: unterminated").is_empty());
        parser.reset();
        assert_eq!(parser.buffered_len(), 0);
        assert_eq!(parser.scanned, 0);
        assert!(!parser.has_pending_frame());
        assert_eq!(payloads(&mut parser, b"data: fresh\n\n"), vec!["fresh"]);
    }
}
