//! Tamper-evident receipts for streamed chat-completion exchanges.
//!
//! A receipt freezes the full event history of one stream together with
//! canonical SHA-256 digests so a separate process can later confirm the
//! record was not altered, entirely offline. Verification proves internal
//! self-consistency only; nothing here signs receipts or vouches for the
//! model output itself.

/// Deterministic JSON serialization and SHA-256 digests.
pub mod canonical;
/// Crate error types.
pub mod error;
/// Receipt document, assembly, and persistence.
pub mod receipt;
/// Verification report text.
pub mod report;
/// Deliberate receipt corruption for exercising rejection paths.
pub mod tamper;
/// Structural and cryptographic receipt validation.
pub mod verify;

pub use canonical::{canonical_json, sha256_json, sha256_json_list, sha256_text, sha256_text_list};
pub use error::ReceiptError;
pub use receipt::{Receipt, ReceiptDraft, ReceiptMeta, load_receipt};
pub use report::build_report;
pub use tamper::{TamperMode, UnknownTamperMode, tamper};
pub use verify::{VerificationResult, verify_receipt};
