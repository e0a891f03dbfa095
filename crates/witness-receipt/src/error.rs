/// Errors raised while loading or persisting receipt documents.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    /// Filesystem access failed.
    #[error("receipt I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The document could not be serialized or parsed as JSON.
    #[error("receipt JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
}
