use serde_json::{Map, Value};

/// Extracted `(content, reasoning)` pair for one decoded event.
///
/// Three provider shapes are recognized, in priority order: a
/// `choices[0].delta` (or `choices[0].message`) object exposing `content`
/// and/or `reasoning_content` strings, a bare string delta inside the first
/// choice, and a top-level `content` string. Empty strings are treated as
/// absent.
pub(crate) fn content_parts(event: &Value) -> (Option<String>, Option<String>) {
    let Some(object) = event.as_object() else {
        return (None, None);
    };
    if let Some(choices) = object.get("choices").and_then(Value::as_array)
        && !choices.is_empty()
    {
        let choice = &choices[0];
        let delta = [choice.get("delta"), choice.get("message")]
            .into_iter()
            .flatten()
            .find(|value| is_truthy(value));
        match delta {
            Some(Value::Object(fields)) => {
                return (
                    string_field(fields, "content"),
                    string_field(fields, "reasoning_content"),
                );
            }
            Some(Value::String(text)) => return (Some(text.clone()), None),
            Some(_) => {}
            None => return (None, None),
        }
    }
    (string_field(object, "content"), None)
}

/// Usage snapshot carried by an event, at the top level or on the first
/// choice. Callers keep the latest snapshot; later events overwrite
/// earlier ones.
pub(crate) fn usage_snapshot(event: &Value) -> Option<&Map<String, Value>> {
    if let Some(usage) = event.get("usage").and_then(Value::as_object) {
        return Some(usage);
    }
    let choices = event.get("choices").and_then(Value::as_array)?;
    choices.first()?.get("usage").and_then(Value::as_object)
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delta_object_yields_content_and_reasoning() {
        let event = json!({
            "choices": [{"delta": {"content": "a", "reasoning_content": "b"}}]
        });
        assert_eq!(
            content_parts(&event),
            (Some("a".to_string()), Some("b".to_string()))
        );
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let event = json!({
            "choices": [{"delta": {"content": "", "reasoning_content": "think"}}]
        });
        assert_eq!(content_parts(&event), (None, Some("think".to_string())));
    }

    #[test]
    fn message_object_is_used_when_delta_is_empty() {
        let event = json!({
            "choices": [{"delta": {}, "message": {"content": "full"}}]
        });
        assert_eq!(content_parts(&event), (Some("full".to_string()), None));
    }

    #[test]
    fn bare_string_delta_is_primary_content() {
        let event = json!({"choices": [{"delta": "chunk"}]});
        assert_eq!(content_parts(&event), (Some("chunk".to_string()), None));
    }

    #[test]
    fn top_level_content_is_recognized_without_choices() {
        let event = json!({"content": "inline"});
        assert_eq!(content_parts(&event), (Some("inline".to_string()), None));
    }

    #[test]
    fn choice_shape_shadows_top_level_content() {
        let event = json!({
            "choices": [{"delta": {"reasoning_content": "r"}}],
            "content": "ignored"
        });
        assert_eq!(content_parts(&event), (None, Some("r".to_string())));
    }

    #[test]
    fn non_object_events_carry_nothing() {
        assert_eq!(content_parts(&json!("text")), (None, None));
        assert_eq!(content_parts(&json!([1, 2])), (None, None));
        assert_eq!(content_parts(&json!(null)), (None, None));
    }

    #[test]
    fn non_string_content_fields_are_ignored() {
        let event = json!({"choices": [{"delta": {"content": 42}}]});
        assert_eq!(content_parts(&event), (None, None));
        let event = json!({"content": {"nested": true}});
        assert_eq!(content_parts(&event), (None, None));
    }

    #[test]
    fn usage_is_read_from_event_or_first_choice() {
        let top = json!({"usage": {"total_tokens": 7}});
        assert_eq!(
            usage_snapshot(&top).and_then(|u| u.get("total_tokens")),
            Some(&json!(7))
        );

        let nested = json!({"choices": [{"usage": {"total_tokens": 9}}]});
        assert_eq!(
            usage_snapshot(&nested).and_then(|u| u.get("total_tokens")),
            Some(&json!(9))
        );

        assert_eq!(usage_snapshot(&json!({"choices": []})), None);
        assert_eq!(usage_snapshot(&json!({"usage": "free"})), None);
    }
}
