//! HTTP client for OpenAI-compatible chat-completions endpoints.

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{ApiCredentials, WatchConfig};
use crate::error::WatchError;

/// Boxed future returned by [`Completer::complete`].
pub type CompletionFuture<'a> = BoxFuture<'a, Result<String, WatchError>>;

/// Anything that turns a prompt and a token budget into generated text.
///
/// Implementations report throttling as [`WatchError::RateLimited`] and
/// every other failure as [`WatchError::Transport`]. Uses a boxed future so
/// the poller can hold a `&dyn Completer`.
pub trait Completer: Send + Sync {
    fn complete<'a>(&'a self, prompt: &'a str, max_tokens: u32) -> CompletionFuture<'a>;
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<serde_json::Value>,
}

impl ApiErrorResponse {
    fn is_rate_limit(&self) -> bool {
        let code = self.code.as_ref().map(|c| c.to_string()).unwrap_or_default();
        [self.error_type.as_deref().unwrap_or(""), code.as_str()]
            .iter()
            .any(|s| s.contains("rate_limit"))
    }
}

#[derive(Deserialize, Debug, Clone)]
struct UsageInfo {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async client for a chat-completions endpoint.
pub struct CompletionClient {
    client: reqwest::Client,
    credentials: ApiCredentials,
    url: String,
    model: String,
    temperature: f32,
}

impl CompletionClient {
    /// Build a client from the watch config. The config's request timeout
    /// applies to every call.
    pub fn new(credentials: ApiCredentials, config: &WatchConfig) -> Result<Self, WatchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mdwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| WatchError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            credentials,
            url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Send one completion request and return the trimmed text.
    pub async fn chat(&self, prompt: &str, max_tokens: u32) -> Result<String, WatchError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: self.temperature,
        };
        debug!(
            "LLM request: model={}, prompt_chars={}, max_tokens={}, temp={}",
            self.model,
            prompt.chars().count(),
            max_tokens,
            self.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(&body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(self.credentials.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| WatchError::Transport(format!("request failed: {e}")))?;

        let status = resp.status();
        let retry_after = parse_retry_after(resp.headers());
        let text = resp
            .text()
            .await
            .map_err(|e| WatchError::Transport(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(WatchError::RateLimited { retry_after });
        }

        let parsed: Result<RawChatResponse, _> = serde_json::from_str(&text);

        if !status.is_success() {
            if let Ok(ref raw) = parsed
                && let Some(ref err) = raw.error
                && err.is_rate_limit()
            {
                return Err(WatchError::RateLimited { retry_after });
            }
            return Err(WatchError::Transport(format!("API HTTP {status}: {text}")));
        }

        let parsed =
            parsed.map_err(|e| WatchError::Transport(format!("failed to parse response: {e}")))?;

        if let Some(err) = parsed.error {
            if err.is_rate_limit() {
                return Err(WatchError::RateLimited { retry_after });
            }
            return Err(WatchError::Transport(format!("API error: {}", err.message)));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        let choice = parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| WatchError::Transport("no completion choices returned".into()))?;

        if choice.finish_reason.as_deref() == Some("length") {
            debug!("completion stopped at max_tokens={max_tokens}");
        }

        match choice.message.content.map(|c| c.trim().to_string()) {
            Some(content) if !content.is_empty() => Ok(content),
            _ => Err(WatchError::Transport("empty completion content".into())),
        }
    }
}

impl Completer for CompletionClient {
    fn complete<'a>(&'a self, prompt: &'a str, max_tokens: u32) -> CompletionFuture<'a> {
        Box::pin(self.chat(prompt, max_tokens))
    }
}

/// Read a `Retry-After` header given in whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
