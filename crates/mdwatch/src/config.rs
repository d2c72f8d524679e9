//! Watch configuration with sensible defaults.
//!
//! [`WatchConfig`] is built once at startup and handed to the
//! [`Poller`](crate::poller::Poller) by value. It never changes while the
//! loop runs, so tests can construct one with tiny intervals and thresholds
//! without touching process-wide state.
//!
//! ```ignore
//! let config = WatchConfig::new("notes.txt")
//!     .with_response_length(ResponseLength::Long)
//!     .with_poll_interval(Duration::from_secs(5))
//!     .with_growth_threshold(100);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::WatchError;
use crate::policy::ResponseLength;
use crate::{API_KEY_ENV, API_URL_ENV, DEFAULT_API_URL, DEFAULT_MODEL, MODEL_ENV};

/// File watched when no path is given on the command line.
pub const DEFAULT_INPUT_FILE: &str = "input.txt";

/// Instruction prepended to the file content in every request.
pub const DEFAULT_INSTRUCTION: &str = "\
Rewrite the following notes as a well-structured Markdown document. \
Use headings for distinct topics, bullet points for lists of facts, \
and fenced code blocks for any code. Keep the original meaning and \
do not invent content";

/// Marks the end of the file content inside the prompt.
pub const PROMPT_SEPARATOR: &str = "---";

/// Immutable settings for one watch session.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// File to monitor.
    pub input_path: PathBuf,
    /// Output budget policy. Default: `regular`.
    pub response_length: ResponseLength,
    /// Pause between polls. Default: 10s.
    pub poll_interval: Duration,
    /// Characters of growth that must be exceeded to trigger a request. Default: 50.
    pub growth_threshold: usize,
    /// Instruction text placed before the file content.
    pub instruction: String,
    /// Upper bound on file characters sent per request. Default: 12000.
    pub max_input_chars: usize,
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,
    /// Chat-completions endpoint. Default: [`DEFAULT_API_URL`].
    pub api_url: String,
    /// Timeout applied to every completion request. Default: 120s.
    pub request_timeout: Duration,
    /// Sampling temperature. Default: 0.3.
    pub temperature: f32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_FILE),
            response_length: ResponseLength::default(),
            poll_interval: Duration::from_secs(10),
            growth_threshold: 50,
            instruction: DEFAULT_INSTRUCTION.to_string(),
            max_input_chars: 12_000,
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            temperature: 0.3,
        }
    }
}

impl WatchConfig {
    /// Create a config for `input_path` with every other field defaulted.
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            ..Default::default()
        }
    }

    pub fn with_response_length(mut self, response_length: ResponseLength) -> Self {
        self.response_length = response_length;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_growth_threshold(mut self, threshold: usize) -> Self {
        self.growth_threshold = threshold;
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Apply `MDWATCH_MODEL` / `MDWATCH_API_URL` overrides when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var(MODEL_ENV)
            && !model.trim().is_empty()
        {
            debug!(%model, "model overridden from environment");
            self.model = model;
        }
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            debug!(%url, "endpoint overridden from environment");
            self.api_url = url;
        }
        self
    }

    /// Assemble the request payload for the given file content.
    ///
    /// Content beyond [`max_input_chars`](Self::max_input_chars) is cut
    /// from the front so the most recent text is what gets rewritten.
    pub fn build_prompt(&self, content: &str) -> String {
        let bounded = bound_input(content, self.max_input_chars);
        if bounded.len() < content.len() {
            warn!(
                max_chars = self.max_input_chars,
                dropped_bytes = content.len() - bounded.len(),
                "file content exceeds input bound, sending most recent tail"
            );
        }
        format!(
            "{}:\n\n{bounded}\n\n{PROMPT_SEPARATOR}\n\n",
            self.instruction
        )
    }
}

/// Keep at most the last `max_chars` characters of `content`.
pub fn bound_input(content: &str, max_chars: usize) -> &str {
    let total = content.chars().count();
    if total <= max_chars {
        return content;
    }
    let skip = total - max_chars;
    match content.char_indices().nth(skip) {
        Some((idx, _)) => content.get(idx..).unwrap_or(content),
        None => "",
    }
}

/// Default monitored file: `input.txt` beside the running executable.
///
/// Falls back to a path relative to the working directory when the
/// executable location cannot be determined.
pub fn default_input_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .map(|dir| dir.join(DEFAULT_INPUT_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_FILE))
}

/// API credential loaded before polling starts.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Read the key from `OPENAI_API_KEY`, loading a `.env` file first if
    /// one exists. Fails fast when the key is absent or blank.
    pub fn from_env() -> Result<Self, WatchError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "failed to parse .env file"),
        }
        Self::from_value(std::env::var(API_KEY_ENV).ok())
    }

    fn from_value(value: Option<String>) -> Result<Self, WatchError> {
        match value {
            Some(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(WatchError::Configuration(format!(
                "{API_KEY_ENV} is not set (export it or add it to a .env file)"
            ))),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}
