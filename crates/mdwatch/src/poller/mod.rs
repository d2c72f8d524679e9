//! The change-triggered poller.
//!
//! Each cycle reads the monitored file, compares its character length with
//! the [`PollCursor`], and either requests a Markdown rewrite, resets the
//! cursor, or does nothing. The decision itself is the pure function
//! [`evaluate`]; [`Poller`] wraps it with file I/O, the requester call,
//! back-off, and the sleep between cycles.
//!
//! # Example
//!
//! ```ignore
//! let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! let mut poller = Poller::new(&client, config)
//!     .with_event_handler(&handler)
//!     .with_backoff(AlignedToInterval::default());
//! poller.run(stop_rx).await?;
//! ```

pub mod events;

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::backoff::{AlignedToInterval, BackoffPolicy};
use crate::api::client::Completer;
use crate::config::WatchConfig;
use crate::error::WatchError;
use events::{EventHandler, NoopHandler, PollEvent};

/// Length of the file, in characters, as of the last successful request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollCursor {
    last_observed_length: usize,
}

impl PollCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_observed_length(&self) -> usize {
        self.last_observed_length
    }

    fn set(&mut self, length: usize) {
        self.last_observed_length = length;
    }
}

/// What a single observation of the file calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Growth strictly exceeds the threshold.
    Request { delta: usize },
    /// The file is shorter than the cursor.
    Reset { from: usize, to: usize },
    /// Not enough change to act on.
    Hold,
}

/// Decide what to do with a file of `current` characters.
pub fn evaluate(current: usize, cursor: PollCursor, threshold: usize) -> Decision {
    let last = cursor.last_observed_length();
    if current < last {
        return Decision::Reset {
            from: last,
            to: current,
        };
    }
    let delta = current - last;
    if delta > threshold {
        Decision::Request { delta }
    } else {
        Decision::Hold
    }
}

/// Result of one [`Poller::poll_once`] cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A request succeeded; the cursor now equals `length`.
    Completed { length: usize, text: String },
    /// The file shrank and the cursor moved down.
    Reset { from: usize, to: usize },
    /// Nothing to do this cycle.
    Unchanged,
    /// Rate limited; pause for `delay` before the next cycle.
    RateLimited { delay: Duration },
}

/// Watches one file and requests rewrites as it grows.
pub struct Poller<'a> {
    config: WatchConfig,
    completer: &'a dyn Completer,
    event_handler: &'a dyn EventHandler,
    backoff: Box<dyn BackoffPolicy>,
    output: Box<dyn Write + Send + 'a>,
    cursor: PollCursor,
    consecutive_rate_limits: u32,
}

impl<'a> Poller<'a> {
    /// Create a poller that prints completions to stdout, with a no-op
    /// event handler and wall-clock aligned back-off.
    pub fn new(completer: &'a dyn Completer, config: WatchConfig) -> Self {
        Self {
            config,
            completer,
            event_handler: &NoopHandler,
            backoff: Box::new(AlignedToInterval::default()),
            output: Box::new(std::io::stdout()),
            cursor: PollCursor::new(),
            consecutive_rate_limits: 0,
        }
    }

    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.event_handler = handler;
        self
    }

    pub fn with_backoff(mut self, policy: impl BackoffPolicy + 'static) -> Self {
        self.backoff = Box::new(policy);
        self
    }

    /// Where completions are written, one per line. A failed write ends the
    /// watch with [`WatchError::Output`] and leaves the cursor in place.
    pub fn with_output(mut self, output: impl Write + Send + 'a) -> Self {
        self.output = Box::new(output);
        self
    }

    pub fn cursor(&self) -> PollCursor {
        self.cursor
    }

    /// Run one read-decide-act cycle without sleeping.
    ///
    /// Returns `Err` only for fatal conditions: an unreadable file, an
    /// output write failure, or a requester failure other than a rate limit.
    pub async fn poll_once(&mut self) -> Result<PollOutcome, WatchError> {
        let path = &self.config.input_path;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| WatchError::Io {
                path: path.clone(),
                source,
            })?;
        let length = content.chars().count();

        self.event_handler.on_event(&PollEvent::Polled {
            length,
            cursor: self.cursor.last_observed_length(),
        });

        match evaluate(length, self.cursor, self.config.growth_threshold) {
            Decision::Hold => Ok(PollOutcome::Unchanged),
            Decision::Reset { from, to } => {
                self.cursor.set(to);
                self.consecutive_rate_limits = 0;
                self.event_handler
                    .on_event(&PollEvent::CursorReset { from, to });
                Ok(PollOutcome::Reset { from, to })
            }
            Decision::Request { delta } => self.request(&content, length, delta).await,
        }
    }

    async fn request(
        &mut self,
        content: &str,
        length: usize,
        delta: usize,
    ) -> Result<PollOutcome, WatchError> {
        // Budget is resolved per call from the policy.
        let max_tokens = self.config.response_length.max_tokens();
        self.event_handler.on_event(&PollEvent::RequestStarted {
            length,
            delta,
            max_tokens,
        });

        let prompt = self.config.build_prompt(content);
        match self.completer.complete(&prompt, max_tokens).await {
            Ok(text) => {
                writeln!(self.output, "{text}")
                    .and_then(|()| self.output.flush())
                    .map_err(WatchError::Output)?;
                self.consecutive_rate_limits = 0;
                self.event_handler.on_event(&PollEvent::Completion(&text));
                self.cursor.set(length);
                Ok(PollOutcome::Completed { length, text })
            }
            Err(WatchError::RateLimited { retry_after }) => {
                let attempt = self.consecutive_rate_limits;
                let delay = self.backoff.delay(attempt, retry_after);
                self.consecutive_rate_limits = attempt.saturating_add(1);
                self.event_handler
                    .on_event(&PollEvent::RateLimited { attempt, delay });
                Ok(PollOutcome::RateLimited { delay })
            }
            Err(e) => Err(e),
        }
    }

    /// Poll until `shutdown` turns `true` or a fatal error occurs.
    ///
    /// Sleeps [`poll_interval`](WatchConfig::poll_interval) between
    /// cycles, or the back-off delay after a rate limit. Shutdown is
    /// honoured while sleeping and while a request is in flight.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), WatchError> {
        info!(
            path = %self.config.input_path.display(),
            response_length = %self.config.response_length,
            threshold = self.config.growth_threshold,
            interval_secs = self.config.poll_interval.as_secs_f64(),
            "watching file"
        );

        loop {
            let outcome = tokio::select! {
                biased;
                () = shutdown_signalled(&mut shutdown) => break,
                outcome = self.poll_once() => outcome?,
            };

            let pause = match outcome {
                PollOutcome::RateLimited { delay } => delay,
                _ => self.config.poll_interval,
            };
            debug!(pause_secs = pause.as_secs_f64(), "sleeping until next poll");

            tokio::select! {
                biased;
                () = shutdown_signalled(&mut shutdown) => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        self.event_handler.on_event(&PollEvent::Stopped);
        Ok(())
    }
}

/// Resolves once shutdown is requested. Never resolves if the sender is
/// dropped without signalling.
async fn shutdown_signalled(rx: &mut watch::Receiver<bool>) {
    let signalled = rx.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}
