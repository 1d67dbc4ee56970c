//! Empty-level notifier port

use serde::Serialize;

#[cfg(test)]
use mockall::automock;

/// "No data at this level" signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    pub level_key: String,
    /// Label of the parent's selected option; `None` for the root level
    pub parent_label: Option<String>,
}

/// Receives empty-level signals. Fire-and-forget: nothing is returned and the
/// resolver never waits on it.
#[cfg_attr(test, automock)]
pub trait EmptyLevelNotifier: Send + Sync {
    fn notify_empty_level(&self, event: &NotificationEvent);
}
