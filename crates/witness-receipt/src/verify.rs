use serde_json::{Map, Value};

use crate::canonical::sha256_json;

/// Outcome of one verification pass.
///
/// `expected`/`actual` are populated only for digest mismatches and exist
/// for diagnostic display, never for control flow.
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationResult {
    pub ok: bool,
    pub reason: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl VerificationResult {
    fn pass() -> Self {
        Self {
            ok: true,
            reason: "hashes match and structure is valid".to_string(),
            expected: None,
            actual: None,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
            expected: None,
            actual: None,
        }
    }

    fn hash_mismatch(key: &str, expected: String, actual: String) -> Self {
        Self {
            ok: false,
            reason: format!("{key} mismatch (expected={expected}, actual={actual})"),
            expected: Some(expected),
            actual: Some(actual),
        }
    }
}

/// Validates structure, counts, and integrity digests of a parsed receipt.
///
/// Checks run in a fixed order and stop at the first failure: top-level
/// shape, `meta`/`events`/`raw_events` presence and type, stored counts
/// against actual lengths, then the two digests recomputed with the shared
/// canonical hasher. A passing result proves internal self-consistency
/// only; there is no signature scheme, so origin and model correctness
/// stay unproven.
pub fn verify_receipt(receipt: &Value) -> VerificationResult {
    let Some(receipt_map) = receipt.as_object() else {
        return VerificationResult::fail("receipt is not a JSON object");
    };
    let Some(meta) = receipt_map.get("meta").and_then(Value::as_object) else {
        return VerificationResult::fail("meta is missing or not an object");
    };
    let events_value = match receipt_map.get("events") {
        Some(value) if value.is_array() => value,
        _ => return VerificationResult::fail("events is missing or not a list"),
    };
    let raw_events_value = match receipt_map.get("raw_events") {
        Some(value) if value.is_array() => value,
        _ => return VerificationResult::fail("raw_events is missing or not a list"),
    };
    let events_len = events_value.as_array().map_or(0, Vec::len);
    let raw_events_len = raw_events_value.as_array().map_or(0, Vec::len);

    if let Some(result) = check_count(meta, "event_count", events_len) {
        return result;
    }
    if let Some(result) = check_count(meta, "raw_event_count", raw_events_len) {
        return result;
    }
    if let Some(result) = check_hash(meta, "events_sha256", events_value) {
        return result;
    }
    if let Some(result) = check_hash(meta, "raw_events_sha256", raw_events_value) {
        return result;
    }

    VerificationResult::pass()
}

/// A stored count is optional; when present it must equal the actual
/// sequence length. JSON `null` counts as absent.
fn check_count(meta: &Map<String, Value>, key: &str, actual: usize) -> Option<VerificationResult> {
    let expected = match meta.get(key) {
        None | Some(Value::Null) => return None,
        Some(value) => value,
    };
    if expected.as_u64() == Some(actual as u64) {
        return None;
    }
    Some(VerificationResult::fail(format!(
        "{key} mismatch (meta={expected}, actual={actual})"
    )))
}

/// A stored digest is mandatory and must match the recomputed one.
fn check_hash(meta: &Map<String, Value>, key: &str, payload: &Value) -> Option<VerificationResult> {
    let Some(expected) = meta.get(key).and_then(Value::as_str) else {
        return Some(VerificationResult::fail(format!("{key} is missing")));
    };
    let actual = sha256_json(payload);
    if expected == actual {
        return None;
    }
    Some(VerificationResult::hash_mismatch(
        key,
        expected.to_string(),
        actual,
    ))
}
