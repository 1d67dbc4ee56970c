//! Notifier forwarding empty-level events to the UI event loop

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::domain::{EmptyLevelNotifier, NotificationEvent};
use crate::infrastructure::observability::record_empty_notification;

/// Event as delivered to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyLevelMessage {
    pub event: NotificationEvent,
    pub emitted_at: DateTime<Utc>,
}

/// Sends every notification through an unbounded channel. A closed receiver
/// is not an error: the presentation layer went away.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<EmptyLevelMessage>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EmptyLevelMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EmptyLevelNotifier for ChannelNotifier {
    fn notify_empty_level(&self, event: &NotificationEvent) {
        record_empty_notification(&event.level_key);

        let message = EmptyLevelMessage {
            event: event.clone(),
            emitted_at: Utc::now(),
        };

        if self.sender.send(message).is_err() {
            tracing::debug!(level = %event.level_key, "Notification receiver dropped");
        }
    }
}
