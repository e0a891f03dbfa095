//! Streaming chat-completion consumer with timing instrumentation.
//!
//! Drives one HTTP streaming POST against an OpenAI-compatible endpoint,
//! decodes the server-sent data frames as they arrive, emits text
//! incrementally, and measures time-to-first-token and stall gaps. On
//! clean completion the full event history can be frozen into a
//! tamper-evident receipt (`witness-receipt`).
//!
//! One invocation owns one stream; there is no internal parallelism and no
//! shared mutable state between concurrent calls.

/// The streaming HTTP client and consume loop.
pub mod client;
/// Wire frame decoding.
pub mod decode;
/// Crate error types.
pub mod errors;
/// Provider response-shape extraction.
pub(crate) mod extract;
/// Request options and content-mode selection.
pub mod options;
/// Stream outcome type.
pub mod result;
/// Pluggable output destinations.
pub mod sink;
/// Emission timing and stall tracking.
pub(crate) mod timing;

pub use client::{StreamClient, StreamRequest};
pub use decode::{DONE_SENTINEL, FrameDecoder};
pub use errors::{StreamError, TransportFailure};
pub use options::{
    ContentMode, ReceiptCapture, RequestParams, StreamOptions, StreamUsageOptions,
    UnknownContentMode,
};
pub use result::StreamResult;
pub use sink::{BufferSink, EmitSink, StdioSink};
