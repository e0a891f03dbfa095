use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{sha256_json_list, sha256_text, sha256_text_list};
use crate::error::ReceiptError;

/// Metadata block persisted alongside the captured event sequences.
///
/// `events_sha256` and `raw_events_sha256` are the integrity digests the
/// verifier recomputes; the counts let it reject truncation without hashing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceiptMeta {
    pub label: String,
    pub model: String,
    pub api_url: String,
    pub started_at: String,
    pub ttfb_seconds: f64,
    pub ttc_seconds: f64,
    pub event_count: u64,
    pub raw_event_count: u64,
    pub parse_errors: u64,
    pub prompt_sha256: String,
    pub events_sha256: String,
    pub raw_events_sha256: String,
}

/// A persisted, hash-verifiable record of one completed stream.
///
/// `events` holds every successfully decoded structured payload and
/// `raw_events` the exact text of every data frame, both in arrival order.
/// Receipts are built once at stream completion and never mutated; the
/// tamper simulator clones before corrupting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub meta: ReceiptMeta,
    pub events: Vec<Value>,
    pub raw_events: Vec<String>,
}

/// Inputs collected by the stream consumer for receipt assembly.
#[derive(Clone, Debug)]
pub struct ReceiptDraft {
    pub label: String,
    pub model: String,
    pub api_url: String,
    pub started_at: String,
    pub ttfb_seconds: f64,
    pub ttc_seconds: f64,
    pub parse_errors: u64,
    pub prompt: String,
    pub events: Vec<Value>,
    pub raw_events: Vec<String>,
}

impl Receipt {
    /// Assembles a receipt, computing counts and integrity digests from the
    /// captured sequences.
    pub fn build(draft: ReceiptDraft) -> Self {
        let meta = ReceiptMeta {
            label: if draft.label.is_empty() {
                "stream".to_string()
            } else {
                draft.label
            },
            model: draft.model,
            api_url: draft.api_url,
            started_at: draft.started_at,
            ttfb_seconds: draft.ttfb_seconds,
            ttc_seconds: draft.ttc_seconds,
            event_count: draft.events.len() as u64,
            raw_event_count: draft.raw_events.len() as u64,
            parse_errors: draft.parse_errors,
            prompt_sha256: sha256_text(&draft.prompt),
            events_sha256: sha256_json_list(&draft.events),
            raw_events_sha256: sha256_text_list(&draft.raw_events),
        };
        Self {
            meta,
            events: draft.events,
            raw_events: draft.raw_events,
        }
    }

    /// Receipt as a generic JSON value with object keys sorted.
    pub fn to_value(&self) -> Result<Value, ReceiptError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Writes the receipt as pretty-printed, key-sorted UTF-8 JSON under
    /// `dir`, creating the directory if needed.
    ///
    /// The filename embeds a UTC timestamp plus sanitized label and model
    /// tokens. Two receipts for the same label and model written within the
    /// same second collide; callers accept that window.
    pub fn persist(&self, dir: &Path) -> Result<PathBuf, ReceiptError> {
        fs::create_dir_all(dir)?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let label = slug_or(&self.meta.label, "stream");
        let model = slug_or(&self.meta.model, "model");
        let path = dir.join(format!("receipt_{timestamp}_{label}_{model}.json"));
        let value = self.to_value()?;
        fs::write(&path, serde_json::to_string_pretty(&value)?)?;
        Ok(path)
    }
}

/// Parses a receipt file into a generic JSON value for verification.
pub fn load_receipt(path: &Path) -> Result<Value, ReceiptError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn safe_slug(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

fn slug_or(value: &str, fallback: &str) -> String {
    let slug = safe_slug(value);
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}
