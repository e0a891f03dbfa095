use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Optional provider request parameters.
///
/// Every field is omitted from the outbound request unless explicitly set,
/// leaving the provider's own defaults in force otherwise.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamUsageOptions>,
}

/// Provider flag requesting usage accounting on the stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUsageOptions {
    pub include_usage: bool,
}

impl RequestParams {
    /// Sets the sampling temperature.
    pub fn temperature(mut self, value: f64) -> Self {
        self.temperature = Some(value);
        self
    }

    /// Sets the completion token limit.
    pub fn max_tokens(mut self, value: u32) -> Self {
        self.max_tokens = Some(value);
        self
    }

    /// Sets nucleus sampling mass.
    pub fn top_p(mut self, value: f64) -> Self {
        self.top_p = Some(value);
        self
    }

    /// Sets the sampling seed.
    pub fn seed(mut self, value: i64) -> Self {
        self.seed = Some(value);
        self
    }

    /// Sets stop sequences.
    pub fn stop(mut self, sequences: Vec<String>) -> Self {
        self.stop = Some(sequences);
        self
    }

    /// Requests a usage snapshot in the final stream event.
    pub fn include_usage(mut self, include: bool) -> Self {
        self.stream_options = Some(StreamUsageOptions {
            include_usage: include,
        });
        self
    }

    /// Builds params from a loose key/value map, keeping only the fixed
    /// allow-list.
    ///
    /// Unknown keys are dropped with a warning, as are values that fail to
    /// match the expected type; the request proceeds without them.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let mut params = Self::default();
        for (key, value) in map {
            let accepted = match key.as_str() {
                "temperature" => {
                    params.temperature = value.as_f64();
                    params.temperature.is_some()
                }
                "max_tokens" => {
                    params.max_tokens = value.as_u64().and_then(|n| u32::try_from(n).ok());
                    params.max_tokens.is_some()
                }
                "top_p" => {
                    params.top_p = value.as_f64();
                    params.top_p.is_some()
                }
                "seed" => {
                    params.seed = value.as_i64();
                    params.seed.is_some()
                }
                "stop" => {
                    params.stop = string_list(value);
                    params.stop.is_some()
                }
                "stream_options" => {
                    params.stream_options = serde_json::from_value(value.clone()).ok();
                    params.stream_options.is_some()
                }
                _ => false,
            };
            if !accepted {
                warn!(param = %key, "unsupported request param ignored");
            }
        }
        params
    }

    /// Merges the set fields into an outbound request body.
    pub(crate) fn merge_into(&self, body: &mut Map<String, Value>) {
        if let Ok(Value::Object(fields)) = serde_json::to_value(self) {
            for (key, value) in fields {
                body.insert(key, value);
            }
        }
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    let strings: Vec<String> = items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect();
    if strings.len() == items.len() {
        Some(strings)
    } else {
        None
    }
}

/// Which extracted text field is counted and emitted per event.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Emit primary content only.
    Content,
    /// Emit reasoning text only.
    Reasoning,
    /// Prefer primary content, fall back to reasoning when it is absent.
    #[default]
    ContentOrReasoning,
}

impl ContentMode {
    /// Chooses the text to emit for one event.
    pub fn select(self, content: Option<String>, reasoning: Option<String>) -> Option<String> {
        match self {
            Self::Content => content,
            Self::Reasoning => reasoning,
            Self::ContentOrReasoning => content.or(reasoning),
        }
    }

    /// Identifier accepted by `FromStr` and used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Reasoning => "reasoning",
            Self::ContentOrReasoning => "content_or_reasoning",
        }
    }
}

/// Error for an unrecognized content mode identifier.
#[derive(Debug, thiserror::Error)]
#[error("unknown content mode: {0}")]
pub struct UnknownContentMode(pub String);

impl FromStr for ContentMode {
    type Err = UnknownContentMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "content" => Ok(Self::Content),
            "reasoning" => Ok(Self::Reasoning),
            "content_or_reasoning" => Ok(Self::ContentOrReasoning),
            other => Err(UnknownContentMode(other.to_string())),
        }
    }
}

/// Options bundle for one streaming call.
#[derive(Clone, Debug, Default)]
pub struct StreamOptions {
    /// Optional provider request parameters forwarded in the POST body.
    pub params: RequestParams,
    /// Inter-emission gap, in seconds, counted as a stall when reached.
    pub stall_threshold_seconds: Option<f64>,
    /// Which extracted text field is emitted and counted.
    pub content_mode: ContentMode,
    /// Receipt capture destination; `None` disables capture.
    pub receipt: Option<ReceiptCapture>,
}

/// Where and under which label a receipt is persisted.
#[derive(Clone, Debug)]
pub struct ReceiptCapture {
    pub dir: PathBuf,
    pub label: String,
}
