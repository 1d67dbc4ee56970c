//! Per-level state store

use serde::Serialize;

use super::level::SelectOption;

/// Snapshot of one level: current selection, options of the last completed fetch
/// and whether a fetch is in flight
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelState {
    pub selection: Option<String>,
    pub options: Vec<SelectOption>,
    pub loading: bool,
}

impl LevelState {
    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }

    /// Label of the currently selected option, if it is among the options
    pub fn selected_label(&self) -> Option<&str> {
        let selection = self.selection.as_deref()?;

        self.options
            .iter()
            .find(|o| o.value == selection)
            .map(|o| o.label.as_str())
    }
}

/// Mutable state of a single level.
///
/// The store knows nothing about other levels: resets and fetches of dependent
/// levels are driven by the resolver.
#[derive(Debug, Default)]
pub struct LevelStore {
    state: LevelState,
}

impl LevelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LevelState {
        &self.state
    }

    pub fn snapshot(&self) -> LevelState {
        self.state.clone()
    }

    pub fn set_selection(&mut self, value: Option<String>) {
        self.state.selection = value;
    }

    /// Options are kept until the load completes
    pub fn begin_load(&mut self) {
        self.state.loading = true;
    }

    /// A selection missing from `options` is left in place
    pub fn complete_load(&mut self, options: Vec<SelectOption>) {
        self.state.options = options;
        self.state.loading = false;
    }

    pub fn reset(&mut self) {
        self.state = LevelState::default();
    }
}
