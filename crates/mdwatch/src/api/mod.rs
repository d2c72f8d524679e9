//! Completion requester boundary: the HTTP client and rate-limit back-off.
//!
//! - [`client`] — the [`Completer`] trait the poller depends on, and
//!   [`CompletionClient`], a reqwest-backed implementation for
//!   OpenAI-compatible chat-completions endpoints.
//! - [`backoff`] — [`BackoffPolicy`] and the stock fixed, wall-clock
//!   aligned, and capped exponential policies.

pub mod backoff;
pub mod client;

pub use backoff::{AlignedToInterval, BackoffPolicy, CappedExponential, FixedDelay};
pub use client::{Completer, CompletionClient, CompletionFuture};
