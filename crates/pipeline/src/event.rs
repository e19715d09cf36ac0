//! UI tap events
//!
//! A one-way stream of events for the embedding shell (CLI, desktop window,
//! whatever hosts the pipeline): human-readable status lines from every
//! stage, plus each non-empty [`ResolvedBatch`] for local display. Delivery
//! to the tap never blocks the pipeline and expects no acknowledgment; if
//! the receiver is gone, events are dropped.

use bidwatch_catalog::ResolvedBatch;
use tokio::sync::mpsc;

/// One event on the UI tap
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Human-readable pipeline status line
    Status(String),
    /// A batch that passed matching, delivered for local display
    /// independent of network broadcast
    Batch(ResolvedBatch),
}

/// Create the tap channel
pub fn ui_channel() -> (UiSender, mpsc::UnboundedReceiver<UiEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiSender { tx }, rx)
}

/// Sending side of the UI tap, cloned into every pipeline component
#[derive(Debug, Clone)]
pub struct UiSender {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiSender {
    /// Emit a status line
    pub fn status(&self, message: impl Into<String>) {
        let _ = self.tx.send(UiEvent::Status(message.into()));
    }

    /// Emit a batch for local display
    pub fn batch(&self, batch: ResolvedBatch) {
        let _ = self.tx.send(UiEvent::Batch(batch));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (ui, mut rx) = ui_channel();
        ui.status("first");
        ui.batch(ResolvedBatch::Unresolved(vec!["Shield".to_string()]));
        ui.status("last");

        assert_eq!(rx.try_recv().unwrap(), UiEvent::Status("first".into()));
        assert!(matches!(rx.try_recv().unwrap(), UiEvent::Batch(_)));
        assert_eq!(rx.try_recv().unwrap(), UiEvent::Status("last".into()));
    }

    #[test]
    fn test_send_without_receiver_is_silent() {
        let (ui, rx) = ui_channel();
        drop(rx);
        ui.status("nobody listening");
    }
}
