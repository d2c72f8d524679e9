//! Events and handlers for the [`Poller`](super::Poller).
//!
//! The poller reports every decision through [`PollEvent`] values. Callers
//! implement [`EventHandler`] to log, update counters, or record events in
//! tests. Completions themselves are written by the poller to its output
//! writer, where a failed write is fatal.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or silent runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |

use std::time::Duration;

use tracing::{debug, info, warn};

/// Events emitted by the poller during a watch session.
#[derive(Debug)]
pub enum PollEvent<'a> {
    /// The file was read. `length` is in characters.
    Polled { length: usize, cursor: usize },
    /// Growth exceeded the threshold; a request is about to be sent.
    RequestStarted { length: usize, delta: usize, max_tokens: u32 },
    /// The requester returned Markdown for the current content.
    Completion(&'a str),
    /// The file shrank below the cursor; the cursor was moved down.
    CursorReset { from: usize, to: usize },
    /// The requester was rate limited; the cursor stays put.
    RateLimited { attempt: u32, delay: Duration },
    /// Shutdown was signalled and the loop is exiting.
    Stopped,
}

/// Handler for poller events.
///
/// The default implementation ignores every event.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &PollEvent<'_>) {
        let _ = event;
    }
}

/// Ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// Logs events through `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &PollEvent<'_>) {
        match event {
            PollEvent::Polled { length, cursor } => {
                debug!(length, cursor, "polled monitored file");
            }
            PollEvent::RequestStarted {
                length,
                delta,
                max_tokens,
            } => {
                info!(length, delta, max_tokens, "growth over threshold, requesting rewrite");
            }
            PollEvent::Completion(text) => {
                debug!(chars = text.chars().count(), "received completion");
            }
            PollEvent::CursorReset { from, to } => {
                info!(from, to, "file shrank, cursor reset");
            }
            PollEvent::RateLimited { attempt, delay } => {
                warn!(
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    "rate limited, backing off"
                );
            }
            PollEvent::Stopped => info!("watch stopped"),
        }
    }
}

/// An event handler backed by a closure.
pub struct FnEventHandler<F>(F)
where
    F: Fn(&PollEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&PollEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&PollEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &PollEvent<'_>) {
        (self.0)(event)
    }
}
