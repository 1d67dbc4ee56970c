//! Renderer-agnostic level presentation and the guarded empty-level policy

use serde::Serialize;

use super::level::LevelDefinition;
use super::notifier::NotificationEvent;
use super::store::LevelState;

/// How a level should be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    Loading,
    EmptyNeedsAttention,
    Normal,
}

/// Resolved state of one level, ready for a renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelView {
    pub index: usize,
    pub key: String,
    pub state: LevelState,
    pub disabled: bool,
    pub mode: RenderMode,
}

/// Empty state at this level is a real gap, not a pending parent or a fetch in flight
fn is_reportable_empty(
    level: &LevelState,
    parent: Option<&LevelState>,
    definition: &LevelDefinition,
) -> bool {
    if level.loading || !level.options.is_empty() {
        return false;
    }

    if definition.is_root() {
        return true;
    }

    definition.is_required() && parent.is_some_and(LevelState::has_selection)
}

/// Decide whether an empty level deserves a notification. Pure: repeated calls
/// with the same input return the same answer; de-duplication lives in
/// [`NotificationGuard`].
pub fn compute_notification(
    level: &LevelState,
    parent: Option<&LevelState>,
    definition: &LevelDefinition,
) -> Option<NotificationEvent> {
    if !is_reportable_empty(level, parent, definition) {
        return None;
    }

    Some(NotificationEvent {
        level_key: definition.key().to_string(),
        parent_label: parent.and_then(|p| p.selected_label()).map(str::to_string),
    })
}

/// Build the view of a level
pub fn present_level(
    index: usize,
    level: &LevelState,
    parent: Option<&LevelState>,
    definition: &LevelDefinition,
) -> LevelView {
    let mode = if level.loading {
        RenderMode::Loading
    } else if is_reportable_empty(level, parent, definition) {
        RenderMode::EmptyNeedsAttention
    } else {
        RenderMode::Normal
    };

    let parent_missing = !definition.is_root() && !parent.is_some_and(LevelState::has_selection);

    LevelView {
        index,
        key: definition.key().to_string(),
        state: level.clone(),
        disabled: level.loading || parent_missing,
        mode,
    }
}

/// Parent selection at which an empty level was last reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyMark {
    pub parent_selection: Option<String>,
}

/// Fires a level's empty notification once per empty-result event
#[derive(Debug, Clone, Default)]
pub struct NotificationGuard {
    last_notified_empty_at: Option<EmptyMark>,
}

impl NotificationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current state of the level; returns the event to emit, if any
    pub fn observe(
        &mut self,
        level: &LevelState,
        parent: Option<&LevelState>,
        definition: &LevelDefinition,
    ) -> Option<NotificationEvent> {
        if !level.loading && !level.options.is_empty() {
            self.rearm();
            return None;
        }

        let event = compute_notification(level, parent, definition)?;
        let mark = EmptyMark {
            parent_selection: parent.and_then(|p| p.selection.clone()),
        };

        if self.last_notified_empty_at.as_ref() == Some(&mark) {
            return None;
        }

        self.last_notified_empty_at = Some(mark);
        Some(event)
    }

    /// Forget the last report, e.g. after the parent selection changed
    pub fn rearm(&mut self) {
        self.last_notified_empty_at = None;
    }

    pub fn last_notified_empty_at(&self) -> Option<&EmptyMark> {
        self.last_notified_empty_at.as_ref()
    }
}
