/// Sentinel payload marking the logical end of a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder turning response body chunks into data payloads.
///
/// Only lines carrying the case-sensitive `data:` framing prefix are
/// meaningful; blank lines, comments, and any other framing (ids, event
/// names) are skipped. Payloads are returned with surrounding whitespace
/// stripped, in arrival order, regardless of how the bytes were chunked.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Feeds one body chunk and returns every completed data payload.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(index) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=index).collect();
            if let Some(payload) = decode_line(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flushes a trailing line that was never newline-terminated.
    pub fn finish(mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buf);
        decode_line(&line)
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let line = text.trim();
    if line.is_empty() {
        return None;
    }
    let payload = line.strip_prefix("data:")?;
    Some(payload.trim().to_string())
}

/// True when a payload is the logical end-of-stream marker.
pub fn is_done(payload: &str) -> bool {
    payload == DONE_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_handles_partial_chunk_boundaries() {
        let mut decoder = FrameDecoder::default();
        let first = decoder.push_chunk(b"data: {\"choices\":[{\"delta\":{\"content\":\"hel");
        assert!(first.is_empty());
        let second = decoder.push_chunk(b"lo\"}}]}\n\n");
        assert_eq!(second, vec!["{\"choices\":[{\"delta\":{\"content\":\"hello\"}}]}"]);
    }

    #[test]
    fn blank_and_foreign_lines_are_skipped() {
        let mut decoder = FrameDecoder::default();
        let payloads =
            decoder.push_chunk(b"\n: keep-alive\nevent: message\nid: 7\ndata: {\"a\":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn prefix_match_is_case_sensitive() {
        let mut decoder = FrameDecoder::default();
        let payloads = decoder.push_chunk(b"DATA: {\"a\":1}\ndata: {\"b\":2}\n");
        assert_eq!(payloads, vec!["{\"b\":2}"]);
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let mut decoder = FrameDecoder::default();
        let payloads = decoder.push_chunk(b"data: one\r\ndata: two\r\n");
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[test]
    fn surrounding_whitespace_is_stripped_from_payloads() {
        let mut decoder = FrameDecoder::default();
        let payloads = decoder.push_chunk(b"  data:   spaced out   \n");
        assert_eq!(payloads, vec!["spaced out"]);
    }

    #[test]
    fn finish_yields_an_unterminated_trailing_line() {
        let mut decoder = FrameDecoder::default();
        assert!(decoder.push_chunk(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));

        let empty = FrameDecoder::default();
        assert_eq!(empty.finish(), None);
    }

    #[test]
    fn sentinel_is_detected_exactly() {
        assert!(is_done("[DONE]"));
        assert!(!is_done("[done]"));
        assert!(!is_done("[DONE] "));
    }
}
