/// Errors surfaced before a stream produces any `StreamResult`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Transport or HTTP failure captured into a failed `StreamResult`.
///
/// Never retried by the client; retry and backoff are caller concerns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportFailure {
    pub message: String,
    pub status_code: Option<u16>,
}

impl TransportFailure {
    /// Creates a transport failure with an optional HTTP status.
    pub fn new(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status_code,
        }
    }
}
