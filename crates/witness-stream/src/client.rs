use std::ops::ControlFlow;
use std::pin::Pin;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt as _;
use reqwest::header::ACCEPT;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use witness_receipt::{Receipt, ReceiptDraft};

use crate::decode::{FrameDecoder, is_done};
use crate::errors::{StreamError, TransportFailure};
use crate::extract::{content_parts, usage_snapshot};
use crate::options::{ContentMode, StreamOptions};
use crate::result::StreamResult;
use crate::sink::EmitSink;
use crate::timing::EmissionTiming;

/// Bound applied to connection setup and to each body read.
///
/// There is no per-token deadline: a slow but alive stream keeps going and
/// shows up in the stall metrics instead of being aborted.
const NETWORK_TIMEOUT: Duration = Duration::from_secs(60);

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportFailure>> + Send>>;

/// Target and payload identity for one streaming call.
#[derive(Clone, Debug)]
pub struct StreamRequest {
    /// Chat-completions endpoint URL.
    pub api_url: String,
    /// Bearer credential.
    pub api_key: String,
    /// Prompt text sent as the single user message.
    pub prompt: String,
    /// Provider model identifier.
    pub model: String,
}

/// Drives single streaming chat-completion calls and measures them.
///
/// Each call owns its own state; running several calls concurrently from
/// separate tasks needs no coordination.
pub struct StreamClient {
    http: reqwest::Client,
}

impl StreamClient {
    /// Creates a client with the fixed 60-second network bound.
    pub fn new() -> Result<Self, StreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(NETWORK_TIMEOUT)
            .read_timeout(NETWORK_TIMEOUT)
            .build()
            .map_err(|e| StreamError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Executes one streaming POST and consumes it to completion.
    ///
    /// Transport and HTTP failures are reported through the returned
    /// `StreamResult` (`success() == false`), never retried; text already
    /// emitted is kept. Malformed frames are counted and skipped. Exactly
    /// one trailing newline is written to the sink at the end of
    /// processing, success or failure. When receipt capture is requested
    /// and the stream completes cleanly, the receipt is persisted and its
    /// path attached to the result; a failed write only logs a warning.
    pub async fn execute(
        &self,
        request: &StreamRequest,
        options: &StreamOptions,
        sink: &mut dyn EmitSink,
    ) -> StreamResult {
        let body = build_request_body(request, options);
        let started_at = Utc::now().to_rfc3339();
        let start = Instant::now();
        let prepared = self.open_stream(request, &body).await;
        run_prepared(request, options, prepared, started_at, start, sink).await
    }

    async fn open_stream(
        &self,
        request: &StreamRequest,
        body: &Value,
    ) -> Result<(u16, ByteStream), TransportFailure> {
        debug!(model = %request.model, url = %request.api_url, "starting chat completion stream");
        let response = self
            .http
            .post(&request.api_url)
            .bearer_auth(&request.api_key)
            .header(ACCEPT, "text/event-stream")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                TransportFailure::new(
                    format!("request failed: {e}"),
                    e.status().map(|status| status.as_u16()),
                )
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportFailure::new(
                format!("server returned status {status}"),
                Some(status.as_u16()),
            ));
        }
        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| TransportFailure::new(format!("stream read failed: {e}"), None)));
        Ok((status.as_u16(), Box::pin(stream)))
    }
}

/// Consumes an already-opened (or already-failed) stream to a result.
///
/// Split from `execute` so the consume loop can be driven by synthetic
/// byte streams in tests.
pub(crate) async fn run_prepared(
    request: &StreamRequest,
    options: &StreamOptions,
    prepared: Result<(u16, ByteStream), TransportFailure>,
    started_at: String,
    start: Instant,
    sink: &mut dyn EmitSink,
) -> StreamResult {
    let mut state = StreamState::new(options);

    let outcome = match prepared {
        Ok((status, bytes_stream)) => {
            state.status_code = Some(status);
            consume_stream(bytes_stream, &mut state, options.content_mode, sink).await
        }
        Err(failure) => Err(failure),
    };

    finalize(request, options, state, outcome, started_at, start, sink)
}

async fn consume_stream(
    mut bytes_stream: ByteStream,
    state: &mut StreamState,
    mode: ContentMode,
    sink: &mut dyn EmitSink,
) -> Result<(), TransportFailure> {
    let mut decoder = FrameDecoder::default();
    while let Some(chunk) = bytes_stream.next().await {
        let chunk = chunk?;
        for payload in decoder.push_chunk(&chunk) {
            if state.handle_payload(&payload, mode, sink).is_break() {
                return Ok(());
            }
        }
    }
    if let Some(payload) = decoder.finish() {
        let _ = state.handle_payload(&payload, mode, sink);
    }
    Ok(())
}

struct StreamState {
    capture: bool,
    text: String,
    events: Vec<Value>,
    raw_events: Vec<String>,
    parse_errors: u64,
    output_chars: u64,
    content_chars: u64,
    reasoning_chars: u64,
    usage: Option<Map<String, Value>>,
    status_code: Option<u16>,
    timing: EmissionTiming,
}

impl StreamState {
    fn new(options: &StreamOptions) -> Self {
        Self {
            capture: options.receipt.is_some(),
            text: String::new(),
            events: Vec::new(),
            raw_events: Vec::new(),
            parse_errors: 0,
            output_chars: 0,
            content_chars: 0,
            reasoning_chars: 0,
            usage: None,
            status_code: None,
            timing: EmissionTiming::new(options.stall_threshold_seconds),
        }
    }

    /// Processes one data payload; `Break` means the sentinel ended the
    /// stream.
    fn handle_payload(
        &mut self,
        payload: &str,
        mode: ContentMode,
        sink: &mut dyn EmitSink,
    ) -> ControlFlow<()> {
        if self.capture {
            self.raw_events.push(payload.to_string());
        }
        if is_done(payload) {
            return ControlFlow::Break(());
        }
        let event: Value = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(_) => {
                self.parse_errors += 1;
                return ControlFlow::Continue(());
            }
        };
        if self.capture && event.is_object() {
            self.events.push(event.clone());
        }
        if let Some(usage) = usage_snapshot(&event) {
            self.usage = Some(usage.clone());
        }
        let (content, reasoning) = content_parts(&event);
        if let Some(content) = &content {
            self.content_chars += content.chars().count() as u64;
        }
        if let Some(reasoning) = &reasoning {
            self.reasoning_chars += reasoning.chars().count() as u64;
        }
        let Some(emitted) = mode.select(content, reasoning) else {
            return ControlFlow::Continue(());
        };
        self.timing.record(Instant::now());
        self.output_chars += emitted.chars().count() as u64;
        sink.emit(&emitted);
        self.text.push_str(&emitted);
        ControlFlow::Continue(())
    }
}

fn build_request_body(request: &StreamRequest, options: &StreamOptions) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), json!(request.model));
    body.insert(
        "messages".to_string(),
        json!([{"role": "user", "content": request.prompt}]),
    );
    body.insert("stream".to_string(), json!(true));
    options.params.merge_into(&mut body);
    Value::Object(body)
}

fn finalize(
    request: &StreamRequest,
    options: &StreamOptions,
    state: StreamState,
    outcome: Result<(), TransportFailure>,
    started_at: String,
    start: Instant,
    sink: &mut dyn EmitSink,
) -> StreamResult {
    let StreamState {
        capture: _,
        text,
        events,
        raw_events,
        parse_errors,
        output_chars,
        content_chars,
        reasoning_chars,
        usage,
        status_code,
        timing,
    } = state;

    if let Err(failure) = &outcome {
        sink.emit_error(&format!("Error: {}", failure.message));
    }
    let end = Instant::now();
    sink.emit("\n");

    let ttfb_seconds = timing
        .first_emission()
        .unwrap_or(end)
        .duration_since(start)
        .as_secs_f64();
    let ttc_seconds = end.duration_since(start).as_secs_f64();

    let mut receipt_path = None;
    let mut error = None;
    let mut status_code = status_code;
    match outcome {
        Ok(()) => {
            if let Some(capture) = &options.receipt {
                let receipt = Receipt::build(ReceiptDraft {
                    label: capture.label.clone(),
                    model: request.model.clone(),
                    api_url: request.api_url.clone(),
                    started_at: started_at.clone(),
                    ttfb_seconds,
                    ttc_seconds,
                    parse_errors,
                    prompt: request.prompt.clone(),
                    events,
                    raw_events,
                });
                match receipt.persist(&capture.dir) {
                    Ok(path) => receipt_path = Some(path),
                    Err(persist_error) => {
                        warn!(error = %persist_error, "unable to write receipt");
                    }
                }
            }
        }
        Err(failure) => {
            error = Some(failure.message);
            if failure.status_code.is_some() {
                status_code = failure.status_code;
            }
        }
    }

    StreamResult {
        text,
        ttfb_seconds,
        ttc_seconds,
        receipt_path,
        output_chars,
        content_chars,
        reasoning_chars,
        parse_errors,
        stall_count: timing.stall_count(),
        stall_max_gap_seconds: timing.max_gap_seconds(),
        usage,
        error,
        status_code,
        started_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ReceiptCapture;
    use crate::sink::BufferSink;
    use bytes::Bytes;
    use futures::stream;
    use witness_receipt::{load_receipt, verify_receipt};

    fn request() -> StreamRequest {
        StreamRequest {
            api_url: "https://api.example.test/v1/chat/completions".to_string(),
            api_key: "k".to_string(),
            prompt: "hello".to_string(),
            model: "glm-4.6".to_string(),
        }
    }

    fn byte_stream(chunks: Vec<Result<&'static str, TransportFailure>>) -> ByteStream {
        Box::pin(stream::iter(chunks.into_iter().map(|chunk| {
            chunk.map(|text| Bytes::from_static(text.as_bytes()))
        })))
    }

    async fn run(
        options: &StreamOptions,
        prepared: Result<(u16, ByteStream), TransportFailure>,
    ) -> (StreamResult, BufferSink) {
        let mut sink = BufferSink::default();
        let result = run_prepared(
            &request(),
            options,
            prepared,
            Utc::now().to_rfc3339(),
            Instant::now(),
            &mut sink,
        )
        .await;
        (result, sink)
    }

    #[tokio::test]
    async fn text_is_accumulated_and_emitted_in_order() {
        let chunks = byte_stream(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n"),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n"),
        ]);
        let (result, sink) = run(&StreamOptions::default(), Ok((200, chunks))).await;

        assert!(result.success());
        assert_eq!(result.text, "Hello");
        assert_eq!(sink.output, "Hello\n");
        assert_eq!(result.output_chars, 5);
        assert_eq!(result.content_chars, 5);
        assert_eq!(result.parse_errors, 0);
        assert_eq!(result.status_code, Some(200));
        assert!(result.ttfb_seconds <= result.ttc_seconds);
    }

    #[tokio::test]
    async fn malformed_frames_are_counted_and_skipped() {
        let chunks = byte_stream(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n"),
            Ok("data: {not json\n"),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\ndata: [DONE]\n"),
        ]);
        let (result, _) = run(&StreamOptions::default(), Ok((200, chunks))).await;

        assert!(result.success());
        assert_eq!(result.parse_errors, 1);
        assert_eq!(result.text, "ab");
    }

    #[tokio::test]
    async fn empty_stream_reports_equal_first_token_and_completion_times() {
        let (result, sink) = run(&StreamOptions::default(), Ok((200, byte_stream(vec![])))).await;
        assert!(result.success());
        assert_eq!(result.text, "");
        assert_eq!(result.ttfb_seconds, result.ttc_seconds);
        assert_eq!(sink.output, "\n");
    }

    #[tokio::test]
    async fn transport_error_mid_stream_keeps_partial_text() {
        let chunks = byte_stream(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n"),
            Err(TransportFailure::new("connection reset", None)),
        ]);
        let (result, sink) = run(&StreamOptions::default(), Ok((200, chunks))).await;

        assert!(!result.success());
        assert_eq!(result.text, "partial");
        assert_eq!(result.error.as_deref(), Some("connection reset"));
        assert_eq!(result.status_code, Some(200));
        assert_eq!(sink.errors, vec!["Error: connection reset"]);
        assert_eq!(sink.output, "partial\n");
        assert!(result.ttfb_seconds <= result.ttc_seconds);
    }

    #[tokio::test]
    async fn http_failure_before_streaming_reports_status() {
        let prepared = Err(TransportFailure::new(
            "server returned status 503 Service Unavailable",
            Some(503),
        ));
        let (result, sink) = run(&StreamOptions::default(), prepared).await;

        assert!(!result.success());
        assert_eq!(result.status_code, Some(503));
        assert_eq!(result.text, "");
        assert_eq!(result.ttfb_seconds, result.ttc_seconds);
        assert_eq!(sink.output, "\n");
        assert_eq!(sink.errors.len(), 1);
    }

    #[tokio::test]
    async fn content_mode_controls_what_is_emitted() {
        let frame = "data: {\"choices\":[{\"delta\":{\"content\":\"\",\"reasoning_content\":\"x\"}}]}\ndata: [DONE]\n";

        let fallback = StreamOptions {
            content_mode: ContentMode::ContentOrReasoning,
            ..StreamOptions::default()
        };
        let (result, _) = run(&fallback, Ok((200, byte_stream(vec![Ok(frame)])))).await;
        assert_eq!(result.text, "x");
        assert_eq!(result.reasoning_chars, 1);
        assert_eq!(result.content_chars, 0);

        let content_only = StreamOptions {
            content_mode: ContentMode::Content,
            ..StreamOptions::default()
        };
        let (result, _) = run(&content_only, Ok((200, byte_stream(vec![Ok(frame)])))).await;
        assert_eq!(result.text, "");
        // Reasoning characters are tracked even when not emitted.
        assert_eq!(result.reasoning_chars, 1);
        assert_eq!(result.output_chars, 0);
    }

    #[tokio::test]
    async fn usage_snapshots_are_last_write_wins() {
        let chunks = byte_stream(vec![
            Ok("data: {\"usage\":{\"total_tokens\":1}}\n"),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"t\"},\"usage\":{\"total_tokens\":5}}]}\n"),
            Ok("data: [DONE]\n"),
        ]);
        let (result, _) = run(&StreamOptions::default(), Ok((200, chunks))).await;
        let usage = result.usage.expect("usage snapshot");
        assert_eq!(usage.get("total_tokens"), Some(&serde_json::json!(5)));
    }

    #[tokio::test]
    async fn unterminated_trailing_frame_is_still_consumed() {
        let chunks = byte_stream(vec![Ok(
            "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}",
        )]);
        let (result, _) = run(&StreamOptions::default(), Ok((200, chunks))).await;
        assert_eq!(result.text, "tail");
    }

    #[tokio::test]
    async fn receipts_capture_raw_frames_including_sentinel_and_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = StreamOptions {
            receipt: Some(ReceiptCapture {
                dir: dir.path().to_path_buf(),
                label: "capture test".to_string(),
            }),
            ..StreamOptions::default()
        };
        let chunks = byte_stream(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n"),
            Ok("data: %%%\n"),
            Ok("data: [DONE]\n"),
        ]);
        let (result, _) = run(&options, Ok((200, chunks))).await;

        assert!(result.success());
        let path = result.receipt_path.expect("receipt path");
        let receipt = load_receipt(&path).expect("load receipt");
        let verification = verify_receipt(&receipt);
        assert!(verification.ok, "receipt failed: {}", verification.reason);

        let meta = receipt.get("meta").expect("meta");
        assert_eq!(meta.get("event_count"), Some(&serde_json::json!(1)));
        assert_eq!(meta.get("raw_event_count"), Some(&serde_json::json!(3)));
        assert_eq!(meta.get("parse_errors"), Some(&serde_json::json!(1)));
        assert_eq!(meta.get("model"), Some(&serde_json::json!("glm-4.6")));
        let raw_events = receipt.get("raw_events").and_then(|v| v.as_array()).expect("raw");
        assert_eq!(raw_events[1], serde_json::json!("%%%"));
        assert_eq!(raw_events[2], serde_json::json!("[DONE]"));
    }

    #[tokio::test]
    async fn empty_capture_produces_a_verifiable_empty_receipt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = StreamOptions {
            receipt: Some(ReceiptCapture {
                dir: dir.path().to_path_buf(),
                label: String::new(),
            }),
            ..StreamOptions::default()
        };
        let (result, _) = run(&options, Ok((200, byte_stream(vec![])))).await;

        let path = result.receipt_path.expect("receipt path");
        let receipt = load_receipt(&path).expect("load receipt");
        assert!(verify_receipt(&receipt).ok);
        let meta = receipt.get("meta").expect("meta");
        assert_eq!(meta.get("event_count"), Some(&serde_json::json!(0)));
        assert_eq!(meta.get("label"), Some(&serde_json::json!("stream")));
    }

    #[tokio::test]
    async fn no_receipt_is_written_after_transport_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = StreamOptions {
            receipt: Some(ReceiptCapture {
                dir: dir.path().to_path_buf(),
                label: "failing".to_string(),
            }),
            ..StreamOptions::default()
        };
        let chunks = byte_stream(vec![
            Ok(delta_frame_static()),
            Err(TransportFailure::new("reset", None)),
        ]);
        let (result, _) = run(&options, Ok((200, chunks))).await;

        assert!(!result.success());
        assert_eq!(result.receipt_path, None);
        let entries: Vec<_> = std::fs::read_dir(dir.path()).expect("read dir").collect();
        assert!(entries.is_empty());
    }

    fn delta_frame_static() -> &'static str {
        "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n"
    }

    #[test]
    fn request_body_carries_fixed_fields_and_set_params() {
        let options = StreamOptions {
            params: crate::options::RequestParams::default()
                .temperature(0.1)
                .include_usage(true),
            ..StreamOptions::default()
        };
        let body = build_request_body(&request(), &options);
        assert_eq!(body["model"], serde_json::json!("glm-4.6"));
        assert_eq!(body["stream"], serde_json::json!(true));
        assert_eq!(
            body["messages"],
            serde_json::json!([{"role": "user", "content": "hello"}])
        );
        assert_eq!(body["temperature"], serde_json::json!(0.1));
        assert_eq!(
            body["stream_options"],
            serde_json::json!({"include_usage": true})
        );
        assert!(body.get("top_p").is_none());
    }
}
