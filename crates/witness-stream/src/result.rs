use std::path::PathBuf;

use serde_json::{Map, Value};

/// Outcome of one streaming call.
///
/// Created once per invocation and immutable afterwards. On transport
/// failure the partially accumulated fields are preserved rather than
/// discarded, with `error` describing what went wrong.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamResult {
    /// Accumulated emitted text.
    pub text: String,
    /// Seconds from request start to the first emitted token, or to
    /// completion when nothing was emitted.
    pub ttfb_seconds: f64,
    /// Seconds from request start to completion.
    pub ttc_seconds: f64,
    /// Where the receipt was persisted, when capture was on and the
    /// write succeeded.
    pub receipt_path: Option<PathBuf>,
    /// Characters actually emitted to the sink.
    pub output_chars: u64,
    /// Characters carried in primary content fields, emitted or not.
    pub content_chars: u64,
    /// Characters carried in reasoning fields, emitted or not.
    pub reasoning_chars: u64,
    /// Data frames that failed structured decoding.
    pub parse_errors: u64,
    /// Inter-emission gaps at or above the configured threshold.
    pub stall_count: u64,
    /// Largest inter-emission gap observed, in seconds.
    pub stall_max_gap_seconds: f64,
    /// Last usage snapshot seen on the stream, provider-defined.
    pub usage: Option<Map<String, Value>>,
    /// Transport/HTTP error description, if any.
    pub error: Option<String>,
    /// HTTP status code when one was observed.
    pub status_code: Option<u16>,
    /// RFC 3339 timestamp taken when the request was issued.
    pub started_at: String,
}

impl StreamResult {
    /// True iff no transport or HTTP error occurred.
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}
