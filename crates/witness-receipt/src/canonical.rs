use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serializes a JSON-compatible value into its canonical textual form.
///
/// Object keys are sorted lexicographically at every nesting level, no
/// insignificant whitespace is emitted, and non-ASCII characters stay
/// literal. Structurally equal values therefore serialize to identical
/// bytes regardless of original key insertion order.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Lowercase hex SHA-256 digest of a value's canonical serialization.
///
/// This single implementation is shared by the receipt builder and the
/// verifier. A divergence between the two sides would silently invalidate
/// every receipt ever produced, so neither side carries its own copy.
pub fn sha256_json(value: &Value) -> String {
    sha256_bytes(canonical_json(value).as_bytes())
}

/// Canonical digest of an ordered sequence of values.
///
/// Equal to `sha256_json` of a JSON array holding the same items, without
/// requiring the caller to move them into a `Value`.
pub fn sha256_json_list(items: &[Value]) -> String {
    let mut out = String::from("[");
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_value(&mut out, item);
    }
    out.push(']');
    sha256_bytes(out.as_bytes())
}

/// Canonical digest of an ordered sequence of strings.
pub fn sha256_text_list(items: &[String]) -> String {
    let mut out = String::from("[");
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_string(&mut out, item);
    }
    out.push(']');
    sha256_bytes(out.as_bytes())
}

/// Lowercase hex SHA-256 digest of a UTF-8 string.
pub fn sha256_text(text: &str) -> String {
    sha256_bytes(text.as_bytes())
}

fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(number) => out.push_str(&number.to_string()),
        Value::String(text) => write_string(out, text),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (index, (key, item)) in entries.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let code = c as u32;
                out.push_str(&format!("\\u{code:04x}"));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
