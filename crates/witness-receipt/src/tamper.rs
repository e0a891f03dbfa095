use std::str::FromStr;

use serde_json::{Value, json};

/// Corruption applied by the tamper simulator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TamperMode {
    /// Mutate the first structured event, or insert a synthetic one.
    Event,
    /// Perturb the first raw frame's text, or insert a synthetic one.
    Raw,
    /// Overwrite `meta.events_sha256` with an invalid literal.
    Meta,
}

/// Usage error for an unrecognized tamper mode identifier.
#[derive(Debug, thiserror::Error)]
#[error("unknown tamper mode: {0}")]
pub struct UnknownTamperMode(pub String);

impl FromStr for TamperMode {
    type Err = UnknownTamperMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "event" => Ok(Self::Event),
            "raw" => Ok(Self::Raw),
            "meta" => Ok(Self::Meta),
            other => Err(UnknownTamperMode(other.to_string())),
        }
    }
}

/// Returns a deep, independent copy of `receipt` with exactly one corruption
/// applied.
///
/// The input is left untouched; verifying the returned value against its
/// stored digests demonstrates the corresponding rejection path.
pub fn tamper(receipt: &Value, mode: TamperMode) -> Value {
    let mut tampered = receipt.clone();
    let Some(root) = tampered.as_object_mut() else {
        return tampered;
    };
    match mode {
        TamperMode::Event => match root.get_mut("events") {
            Some(Value::Array(events)) if !events.is_empty() => match &mut events[0] {
                Value::Object(first) => {
                    first.insert("tampered".to_string(), Value::Bool(true));
                }
                other => {
                    *other = Value::String(format!("{} [tampered]", text_fragment(other)));
                }
            },
            _ => {
                root.insert("events".to_string(), json!([{"tampered": true}]));
            }
        },
        TamperMode::Raw => match root.get_mut("raw_events") {
            Some(Value::Array(raw_events)) if !raw_events.is_empty() => {
                raw_events[0] = Value::String(format!("{} ", text_fragment(&raw_events[0])));
            }
            _ => {
                root.insert("raw_events".to_string(), json!(["tampered"]));
            }
        },
        TamperMode::Meta => {
            let meta = root.entry("meta").or_insert_with(|| json!({}));
            if let Value::Object(map) = meta {
                map.insert("events_sha256".to_string(), json!("tampered"));
            }
        }
    }
    tampered
}

fn text_fragment(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
