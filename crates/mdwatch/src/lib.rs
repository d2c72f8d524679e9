//! Watch a text file and rewrite its growth as Markdown with an LLM.
//!
//! `mdwatch` polls a file on a fixed interval. Whenever the file has grown
//! by more than a threshold since the last request, the whole file is sent
//! to a chat-completions endpoint together with a fixed instruction asking
//! for a Markdown rewrite, and the response is printed to stdout.
//!
//! # Getting started
//!
//! ```ignore
//! use mdwatch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), WatchError> {
//!     let config = WatchConfig::new("notes.txt").with_response_length(ResponseLength::Long);
//!     let client = CompletionClient::new(ApiCredentials::from_env()?, &config)?;
//!
//!     let (_stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//!     Poller::new(&client, config)
//!         .with_event_handler(&LoggingHandler)
//!         .run(stop_rx)
//!         .await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`poller`] | [`Poller`](poller::Poller), the poll cursor, the growth decision, and events |
//! | [`api`] | [`Completer`](api::Completer) trait, HTTP client, back-off policies |
//! | [`config`] | [`WatchConfig`](config::WatchConfig), credentials, prompt assembly |
//! | [`policy`] | [`ResponseLength`](policy::ResponseLength) and token budgets |
//! | [`error`] | [`WatchError`](error::WatchError) |

pub mod api;
pub mod config;
pub mod error;
pub mod poller;
pub mod policy;
pub mod prelude;

pub use error::WatchError;

// ── Constants ──────────────────────────────────────────────────────

/// Default chat-completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model for rewrite requests.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Optional override for [`DEFAULT_MODEL`].
pub const MODEL_ENV: &str = "MDWATCH_MODEL";

/// Optional override for [`DEFAULT_API_URL`].
pub const API_URL_ENV: &str = "MDWATCH_API_URL";
