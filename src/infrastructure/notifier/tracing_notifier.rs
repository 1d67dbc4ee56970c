use crate::domain::{EmptyLevelNotifier, NotificationEvent};
use crate::infrastructure::observability::record_empty_notification;

/// Reports empty levels as warnings in the log
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl EmptyLevelNotifier for TracingNotifier {
    fn notify_empty_level(&self, event: &NotificationEvent) {
        record_empty_notification(&event.level_key);

        match &event.parent_label {
            Some(parent) => tracing::warn!(
                level = %event.level_key,
                parent = %parent,
                "No {} available for {}",
                event.level_key,
                parent
            ),
            None => tracing::warn!(level = %event.level_key, "No {} available", event.level_key),
        }
    }
}
