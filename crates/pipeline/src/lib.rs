//! Bidwatch pipeline
//!
//! The five-stage monitoring pipeline:
//!
//! ```text
//! [Tailer]          [Per-line stages]                 [Broadcast]
//!   log file ──► extract_tokens ──► resolve_tokens ──► RateLimiter ──► Broadcaster ──► TCP subscribers
//!                (channel filter     (catalog                                          (one JSON array
//!                 + tokenizer)        matcher)                                          per batch)
//! ```
//!
//! One tokio task (owned by the [`Coordinator`]) drives line production and
//! pushes each line through every stage synchronously, so per-line
//! processing is strictly ordered. The broadcaster's accept loop and
//! per-subscriber writer tasks run independently; the catalog refresher
//! communicates only through an atomic table swap.
//!
//! A parallel tap ([`UiEvent`]) surfaces human-readable status lines and
//! every non-empty batch to the embedding shell, independent of network
//! delivery.
//!
//! The [`RateLimiter`] guards the broadcast stage and escalates to a
//! terminal `Tripped` state that tears the whole pipeline down; recovery
//! requires calling [`Coordinator::start`] again.

pub mod broadcast;
mod coordinator;
mod error;
mod event;
mod limiter;
mod matcher;
mod parse;
mod tailer;

pub use broadcast::{Broadcaster, BroadcasterConfig, SubscriberRegistry};
pub use coordinator::{Coordinator, MonitorTarget};
pub use error::{PipelineError, Result};
pub use event::{ui_channel, UiEvent, UiSender};
pub use limiter::{LimiterState, RateLimiter, Verdict};
pub use matcher::resolve_tokens;
pub use parse::extract_tokens;
pub use tailer::LineTailer;

// Re-export the delivery unit for convenience
pub use bidwatch_catalog::ResolvedBatch;
