//! Convenience re-exports for common `mdwatch` types.
//!
//! ```ignore
//! use mdwatch::prelude::*;
//! ```
//!
//! Pulls in the config, client, poller, and stock event handlers. Wire
//! types and the pure growth decision stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::config::{ApiCredentials, WatchConfig};
pub use crate::error::WatchError;
pub use crate::policy::ResponseLength;

// ── Requester ───────────────────────────────────────────────────────
pub use crate::api::{
    AlignedToInterval, BackoffPolicy, CappedExponential, Completer, CompletionClient, FixedDelay,
};

// ── Poller ──────────────────────────────────────────────────────────
pub use crate::poller::events::{
    EventHandler, FnEventHandler, LoggingHandler, NoopHandler, PollEvent,
};
pub use crate::poller::{PollCursor, PollOutcome, Poller};
