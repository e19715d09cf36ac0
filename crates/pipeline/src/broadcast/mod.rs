//! Push broadcast
//!
//! The outbound side of the pipeline: a TCP listener on a fixed local
//! port, a registry of connected subscribers, and fan-out of each admitted
//! batch as one newline-terminated JSON array per message.
//!
//! ```text
//! Coordinator ──► Broadcaster::publish(batch)
//!                      │ serialize once
//!                      ▼
//!                SubscriberRegistry ──► per-subscriber mpsc ──► writer task ──► TCP
//! ```
//!
//! Subscribers are anonymous; anything that connects receives every batch
//! published afterwards until it disconnects or the registry is cleared by
//! a rate-limit trip.

mod registry;
mod server;

pub use registry::{Subscriber, SubscriberRegistry, MAX_SUBSCRIBERS};
pub use server::{Broadcaster, BroadcasterConfig};
