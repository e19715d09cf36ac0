//! Subscriber registry
//!
//! Tracks every connected push subscriber. Connect and disconnect events
//! arrive concurrently from connection tasks, so the set lives behind a
//! lock; `publish` fans out over a snapshot taken at the moment of the
//! call, and a subscriber whose channel is gone is removed without
//! affecting delivery to the others.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::error::{PipelineError, Result};

/// Counter for unique subscriber ids
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Maximum number of concurrent subscribers
pub const MAX_SUBSCRIBERS: usize = 100;

/// Frames buffered per subscriber before it is considered stuck
const CHANNEL_BUFFER_SIZE: usize = 64;

/// One connected push subscriber
#[derive(Debug)]
pub struct Subscriber {
    id: u64,
    peer: SocketAddr,
    /// Pre-serialized frames queued for this subscriber's writer task
    sender: mpsc::Sender<Arc<str>>,
}

impl Subscriber {
    fn new(peer: SocketAddr, sender: mpsc::Sender<Arc<str>>) -> Self {
        Self {
            id: SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            peer,
            sender,
        }
    }

    /// Unique id of this connection
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remote address
    #[inline]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queue a frame; false when the writer task is gone or stuck
    #[inline]
    fn try_send(&self, frame: Arc<str>) -> bool {
        self.sender.try_send(frame).is_ok()
    }
}

/// Insertion-ordered set of live subscribers
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection.
    ///
    /// Returns the subscriber id and the receiving end of its frame queue,
    /// for the connection's writer task. The registry keeps the only
    /// long-lived handle to the subscriber, so dropping it (disconnect or
    /// clear) closes the frame queue and ends the writer task.
    pub fn connect(&self, peer: SocketAddr) -> Result<(u64, mpsc::Receiver<Arc<str>>)> {
        let mut subscribers = self.subscribers.write();

        if subscribers.len() >= MAX_SUBSCRIBERS {
            return Err(PipelineError::MaxSubscribers {
                max: MAX_SUBSCRIBERS,
            });
        }

        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let subscriber = Arc::new(Subscriber::new(peer, sender));
        let id = subscriber.id();
        subscribers.push(subscriber);
        Ok((id, receiver))
    }

    /// Remove a subscriber by id
    pub fn disconnect(&self, id: u64) -> Result<()> {
        let mut subscribers = self.subscribers.write();
        let original_len = subscribers.len();
        subscribers.retain(|s| s.id() != id);

        if subscribers.len() == original_len {
            return Err(PipelineError::SubscriberNotFound { id });
        }
        Ok(())
    }

    /// Number of live subscribers
    pub fn count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Fan a frame out to every current subscriber.
    ///
    /// Iterates a snapshot taken at the moment of the call; connects and
    /// disconnects racing with the publish do not corrupt the iteration.
    /// Subscribers that fail to accept the frame are dropped from the
    /// registry. Returns the number of successful deliveries.
    pub fn publish(&self, frame: Arc<str>) -> usize {
        let snapshot: Vec<Arc<Subscriber>> = self.subscribers.read().clone();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for subscriber in &snapshot {
            if subscriber.try_send(Arc::clone(&frame)) {
                delivered += 1;
            } else {
                dead.push(subscriber.id());
            }
        }

        if !dead.is_empty() {
            self.subscribers
                .write()
                .retain(|s| !dead.contains(&s.id()));
        }

        delivered
    }

    /// Drop every subscriber.
    ///
    /// Closing the frame channels ends the writer tasks, which closes the
    /// connections. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        let dropped = subscribers.len();
        subscribers.clear();
        dropped
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
