//! Error taxonomy shared by the poller and the completion requester.
//!
//! Only [`WatchError::RateLimited`] is recoverable: the poller sleeps and
//! retries the same growth on a later cycle. Every other variant ends the
//! watch loop and is reported by the binary.

use std::path::PathBuf;
use std::time::Duration;

/// Errors produced while watching a file and requesting completions.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Missing credential or an unrecognized response-length value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The monitored file is missing or unreadable.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A completion could not be written to the output.
    #[error("failed to write completion output: {0}")]
    Output(#[source] std::io::Error),

    /// The completion endpoint asked us to slow down.
    #[error("rate limited by completion endpoint{}", fmt_retry_after(.retry_after))]
    RateLimited {
        /// Server-provided `Retry-After` hint, if any.
        retry_after: Option<Duration>,
    },

    /// Any other requester failure: network, timeout, HTTP status, bad body.
    #[error("completion request failed: {0}")]
    Transport(String),
}

impl WatchError {
    /// Whether the poller should back off and retry instead of stopping.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, WatchError::RateLimited { .. })
    }
}

fn fmt_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}
