//! Option cache owned by a chain resolver

use std::collections::HashMap;

use super::level::SelectOption;

#[derive(Debug, Clone)]
struct CachedOptions {
    parent: Option<String>,
    options: Vec<SelectOption>,
}

/// Last fetched options per level, tagged with the parent value they were
/// fetched for.
///
/// Holds at most one entry per level and never evicts on its own: an entry is
/// replaced by the next fetch of its level and dropped when the parent
/// selection moves to another value.
#[derive(Debug, Default)]
pub struct OptionCache {
    entries: HashMap<usize, CachedOptions>,
}

impl OptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options of `level`, only if they were fetched for `parent`
    pub fn get(&self, level: usize, parent: Option<&str>) -> Option<&[SelectOption]> {
        self.entries
            .get(&level)
            .filter(|cached| cached.parent.as_deref() == parent)
            .map(|cached| cached.options.as_slice())
    }

    pub fn insert(&mut self, level: usize, parent: Option<&str>, options: Vec<SelectOption>) {
        self.entries.insert(
            level,
            CachedOptions {
                parent: parent.map(str::to_string),
                options,
            },
        );
    }

    pub fn remove(&mut self, level: usize) {
        self.entries.remove(&level);
    }

    /// Drop every entry for levels deeper than `level`
    pub fn invalidate_below(&mut self, level: usize) -> usize {
        let before = self.entries.len();
        self.entries.retain(|cached_level, _| *cached_level <= level);
        before - self.entries.len()
    }

    /// Level `level` now holds `selection`. Everything deeper than the next
    /// level goes; the next level's entry survives only a cleared selection or
    /// a selection equal to the value it was fetched for.
    pub fn selection_changed(&mut self, level: usize, selection: Option<&str>) -> usize {
        let mut removed = self.invalidate_below(level + 1);

        if let Some(value) = selection {
            let child = level + 1;
            let mismatched = self
                .entries
                .get(&child)
                .is_some_and(|cached| cached.parent.as_deref() != Some(value));

            if mismatched {
                self.entries.remove(&child);
                removed += 1;
            }
        }

        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
