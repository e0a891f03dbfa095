use std::env;
use std::fs;
use std::path::PathBuf;

use tracing::warn;
use witness_stream::{ContentMode, ReceiptCapture, RequestParams, StreamOptions, StreamRequest};

/// Configuration problems that prevent a run from starting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or blank.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    /// `PROMPT_FILE` was set but could not be read.
    #[error("unable to read prompt file {path}: {source}")]
    PromptFile {
        path: String,
        source: std::io::Error,
    },
}

/// Everything one `witness-run` invocation needs, resolved once from the
/// process environment.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub request: StreamRequest,
    pub options: StreamOptions,
}

impl RunConfig {
    /// Reads configuration from the environment (call after `.env` loading).
    ///
    /// `API_URL`, `API_KEY`, `MODEL`, and a prompt (`PROMPT` or
    /// `PROMPT_FILE`) are required. Optional values that fail to parse are
    /// dropped with a warning and the run proceeds with defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = require_env("API_URL")?;
        let api_key = require_env("API_KEY")?;
        let model = require_env("MODEL")?;
        let prompt = load_prompt()?;
        let label = trimmed_env("RUN_LABEL").unwrap_or_default();

        let options = StreamOptions {
            params: request_params_from_env(),
            stall_threshold_seconds: parsed_env::<f64>("STALL_THRESHOLD_SECONDS"),
            content_mode: content_mode_from_env(),
            receipt: receipt_capture_from_env(&label),
        };

        Ok(Self {
            request: StreamRequest {
                api_url,
                api_key,
                prompt,
                model,
            },
            options,
        })
    }
}

fn require_env(key: &'static str) -> Result<String, ConfigError> {
    trimmed_env(key).ok_or(ConfigError::MissingVar(key))
}

fn trimmed_env(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn load_prompt() -> Result<String, ConfigError> {
    if let Some(prompt) = trimmed_env("PROMPT") {
        return Ok(prompt);
    }
    if let Some(path) = trimmed_env("PROMPT_FILE") {
        return fs::read_to_string(&path).map_err(|source| ConfigError::PromptFile { path, source });
    }
    Err(ConfigError::MissingVar("PROMPT"))
}

fn request_params_from_env() -> RequestParams {
    let mut params = RequestParams::default();
    if let Some(temperature) = parsed_env::<f64>("REQUEST_TEMPERATURE") {
        params = params.temperature(temperature);
    }
    if let Some(max_tokens) = parsed_env::<u32>("REQUEST_MAX_TOKENS") {
        params = params.max_tokens(max_tokens);
    }
    if let Some(top_p) = parsed_env::<f64>("REQUEST_TOP_P") {
        params = params.top_p(top_p);
    }
    if let Some(seed) = parsed_env::<i64>("REQUEST_SEED") {
        params = params.seed(seed);
    }
    if let Some(stop) = parse_stop_sequences(&env::var("REQUEST_STOP").unwrap_or_default()) {
        params = params.stop(stop);
    }
    if is_enabled(env::var("REQUEST_STREAM_INCLUDE_USAGE").ok().as_deref(), false) {
        params = params.include_usage(true);
    }
    params
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = trimmed_env(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = key, value = %raw, "invalid value, using default");
            None
        }
    }
}

/// Stop sequences come either as a JSON list of strings or as a
/// `|`-separated plain list.
fn parse_stop_sequences(raw: &str) -> Option<Vec<String>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with('[') {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => match as_string_list(&value) {
                Some(strings) => return Some(strings),
                None => warn!("REQUEST_STOP JSON must be a list of strings; using raw value"),
            },
            Err(_) => warn!("REQUEST_STOP is not valid JSON; using raw value"),
        }
    }
    let parts: Vec<String> = raw
        .split('|')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    if parts.is_empty() { None } else { Some(parts) }
}

fn as_string_list(value: &serde_json::Value) -> Option<Vec<String>> {
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

fn content_mode_from_env() -> ContentMode {
    let Some(raw) = trimmed_env("REQUEST_CONTENT_MODE") else {
        return ContentMode::default();
    };
    match raw.to_ascii_lowercase().parse() {
        Ok(mode) => mode,
        Err(_) => {
            warn!(
                value = %raw,
                "REQUEST_CONTENT_MODE must be one of content, content_or_reasoning, reasoning; using content_or_reasoning"
            );
            ContentMode::default()
        }
    }
}

fn receipt_capture_from_env(label: &str) -> Option<ReceiptCapture> {
    if !is_enabled(env::var("RECEIPT_SAVE").ok().as_deref(), true) {
        return None;
    }
    let dir = env::var("RECEIPT_DIR").unwrap_or_else(|_| "data".to_string());
    let dir = dir.trim();
    if dir.is_empty() {
        return None;
    }
    Some(ReceiptCapture {
        dir: PathBuf::from(dir),
        label: label.to_string(),
    })
}

/// Toggle semantics shared by all boolean variables: unset keeps the
/// default, and only `0`, `false`, and `no` disable.
fn is_enabled(value: Option<&str>, default: bool) -> bool {
    match value {
        None => default,
        Some(value) => !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no"
        ),
    }
}
