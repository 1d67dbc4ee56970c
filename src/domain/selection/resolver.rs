//! Chain resolver - owns the chain state and drives dependent loads
//!
//! Selecting a value at level `i` resets every deeper level and starts a fetch
//! for level `i + 1`. Each in-flight fetch carries a ticket; a response is
//! applied only while its ticket is still the current one for its level, so a
//! slow response for an abandoned parent can never overwrite a newer one.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cache::OptionCache;
use super::fetcher::LevelFetcher;
use super::level::{ChainDefinition, LevelDefinition};
use super::notifier::{EmptyLevelNotifier, NotificationEvent};
use super::presenter::{present_level, LevelView, NotificationGuard};
use super::store::{LevelState, LevelStore};
use crate::domain::DomainError;

/// Configuration for a chain resolver
#[derive(Debug, Clone)]
pub struct ChainResolverConfig {
    /// Reuse options already fetched for the same `(level, parent value)`
    pub cache_options: bool,
}

impl Default for ChainResolverConfig {
    fn default() -> Self {
        Self {
            cache_options: true,
        }
    }
}

/// What a resolver operation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SelectOutcome {
    /// Nothing changed and nothing was fetched
    Unchanged,
    /// Selection applied, no dependent level to load
    Settled { level: usize },
    /// Options applied to `level`
    Loaded {
        level: usize,
        count: usize,
        cached: bool,
    },
    /// Fetch failed; `level` resolved to an empty option list
    FetchFailed { level: usize, message: String },
    /// Response arrived after a newer selection superseded it and was dropped
    StaleResponseDiscarded { level: usize },
}

/// Counters kept per resolver instance
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub fetches_started: u64,
    pub fetches_failed: u64,
    pub cache_hits: u64,
    pub stale_responses_discarded: u64,
    pub notifications_emitted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchTag {
    ticket: u64,
    parent: Option<String>,
}

#[derive(Debug)]
struct PendingFetch {
    level: usize,
    tag: FetchTag,
}

enum LoadPlan {
    Fetch(PendingFetch),
    Done(SelectOutcome, Option<NotificationEvent>),
}

#[derive(Debug)]
struct ChainState {
    stores: Vec<LevelStore>,
    guards: Vec<NotificationGuard>,
    in_flight: Vec<Option<FetchTag>>,
    next_ticket: u64,
    cache: OptionCache,
    root_requested: bool,
    closed: bool,
    stats: ResolverStats,
}

impl ChainState {
    fn new(levels: usize) -> Self {
        Self {
            stores: (0..levels).map(|_| LevelStore::new()).collect(),
            guards: vec![NotificationGuard::new(); levels],
            in_flight: vec![None; levels],
            next_ticket: 1,
            cache: OptionCache::new(),
            root_requested: false,
            closed: false,
            stats: ResolverStats::default(),
        }
    }

    fn parent_state(&self, index: usize) -> Option<&LevelState> {
        index
            .checked_sub(1)
            .map(|parent| self.stores[parent].state())
    }

    fn begin_fetch(&mut self, level: usize, parent: Option<String>) -> PendingFetch {
        let tag = FetchTag {
            ticket: self.next_ticket,
            parent,
        };

        self.next_ticket += 1;
        self.stores[level].begin_load();
        self.in_flight[level] = Some(tag.clone());
        self.stats.fetches_started += 1;

        PendingFetch { level, tag }
    }

    /// Clear selection and options below `index`, forget their pending fetches
    fn reset_below(&mut self, index: usize) {
        for level in index + 1..self.stores.len() {
            self.stores[level].reset();
            self.guards[level].rearm();
            self.in_flight[level] = None;
        }
    }

    /// Apply a new selection at `index` and reset everything that depended on
    /// the old one
    fn change_selection(&mut self, index: usize, value: Option<String>) {
        self.cache.selection_changed(index, value.as_deref());
        self.stores[index].set_selection(value);
        self.reset_below(index);
    }
}

/// Orchestrates the levels of one chain instance
pub struct ChainResolver {
    id: Uuid,
    definition: ChainDefinition,
    fetcher: Arc<dyn LevelFetcher>,
    notifier: Arc<dyn EmptyLevelNotifier>,
    config: ChainResolverConfig,
    state: Mutex<ChainState>,
}

impl std::fmt::Debug for ChainResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainResolver")
            .field("id", &self.id)
            .field("definition", &self.definition)
            .field("config", &self.config)
            .finish()
    }
}

impl ChainResolver {
    /// Create a resolver. The root level starts out loading; call
    /// [`ChainResolver::initialize`] to run its fetch.
    pub fn new(
        definition: ChainDefinition,
        fetcher: Arc<dyn LevelFetcher>,
        notifier: Arc<dyn EmptyLevelNotifier>,
        config: ChainResolverConfig,
    ) -> Self {
        let mut state = ChainState::new(definition.len());
        state.begin_fetch(0, None);

        let id = Uuid::new_v4();
        debug!(chain_id = %id, levels = definition.len(), "Chain resolver created");

        Self {
            id,
            definition,
            fetcher,
            notifier,
            config,
            state: Mutex::new(state),
        }
    }

    /// Create a resolver and load its root level
    pub async fn open(
        definition: ChainDefinition,
        fetcher: Arc<dyn LevelFetcher>,
        notifier: Arc<dyn EmptyLevelNotifier>,
        config: ChainResolverConfig,
    ) -> Result<Self, DomainError> {
        let resolver = Self::new(definition, fetcher, notifier, config);
        resolver.initialize().await?;
        Ok(resolver)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn definition(&self) -> &ChainDefinition {
        &self.definition
    }

    /// Run the root fetch. Only the first call fetches.
    pub async fn initialize(&self) -> Result<SelectOutcome, DomainError> {
        let pending = {
            let mut state = self.lock()?;
            self.ensure_open(&state)?;

            if state.root_requested {
                return Ok(SelectOutcome::Unchanged);
            }

            state.root_requested = true;

            match state.in_flight[0].clone() {
                Some(tag) => PendingFetch { level: 0, tag },
                None => return Ok(SelectOutcome::Unchanged),
            }
        };

        self.run_fetch(pending).await
    }

    /// Select `value` at level `index` (empty string clears the selection).
    ///
    /// Deeper levels are reset before this returns its first `Pending`; the
    /// dependent fetch for `index + 1` is awaited and applied unless a newer
    /// selection superseded it.
    pub async fn select_level(
        &self,
        index: usize,
        value: impl Into<String>,
    ) -> Result<SelectOutcome, DomainError> {
        let value = Some(value.into()).filter(|v| !v.is_empty());

        let plan = {
            let mut state = self.lock()?;
            self.ensure_open(&state)?;
            let definition = self.level_definition(index)?;

            if let Some(parent) = state.parent_state(index) {
                if !parent.has_selection() {
                    return Err(DomainError::invalid_selection_order(
                        definition.key().as_str(),
                        self.definition.levels()[index - 1].key().as_str(),
                    ));
                }
            }

            let current = state.stores[index].state();

            if current.selection == value {
                return Ok(SelectOutcome::Unchanged);
            }

            if let Some(v) = value.as_deref() {
                if current.loading {
                    return Err(DomainError::level_loading(definition.key().as_str()));
                }

                if !current.contains(v) {
                    return Err(DomainError::unknown_option(definition.key().as_str(), v));
                }
            }

            debug!(
                chain_id = %self.id,
                level = %definition.key(),
                selection = ?value,
                "Level selection changed"
            );

            state.change_selection(index, value.clone());

            match value {
                Some(v) if index + 1 < self.definition.len() => {
                    self.plan_load(&mut state, index + 1, v)
                }
                _ => LoadPlan::Done(SelectOutcome::Settled { level: index }, None),
            }
        };

        match plan {
            LoadPlan::Fetch(pending) => self.run_fetch(pending).await,
            LoadPlan::Done(outcome, event) => {
                self.emit(event);
                Ok(outcome)
            }
        }
    }

    /// Select by level key instead of index
    pub async fn select_key(
        &self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<SelectOutcome, DomainError> {
        let index = self
            .definition
            .index_of(key)
            .ok_or_else(|| DomainError::validation(format!("Unknown level '{}'", key)))?;

        self.select_level(index, value).await
    }

    /// Restore a saved selection path level by level, loading the root first.
    /// Stops before the first level that has no options to choose from and
    /// after a load that failed or was superseded; the outcomes applied so far
    /// are returned.
    pub async fn select_path<S: AsRef<str>>(
        &self,
        values: &[S],
    ) -> Result<Vec<SelectOutcome>, DomainError> {
        if values.len() > self.definition.len() {
            return Err(DomainError::level_out_of_range(
                values.len() - 1,
                self.definition.len(),
            ));
        }

        self.initialize().await?;

        let mut outcomes = Vec::with_capacity(values.len());

        for (index, value) in values.iter().enumerate() {
            let selectable = {
                let state = self.lock()?;
                let level = state.stores[index].state();
                !level.loading && !level.options.is_empty()
            };

            if !selectable {
                debug!(
                    chain_id = %self.id,
                    level = %self.definition.levels()[index].key(),
                    "Nothing to restore at level, stopping"
                );
                break;
            }

            let outcome = self.select_level(index, value.as_ref()).await?;
            let stop = matches!(
                outcome,
                SelectOutcome::FetchFailed { .. } | SelectOutcome::StaleResponseDiscarded { .. }
            );

            outcomes.push(outcome);

            if stop {
                break;
            }
        }

        Ok(outcomes)
    }

    /// Clear the selection at `index` and everything below it. Level `index`
    /// keeps its options since its parent did not change.
    pub fn reset_from(&self, index: usize) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        self.ensure_open(&state)?;
        let definition = self.level_definition(index)?;

        state.change_selection(index, None);

        debug!(chain_id = %self.id, level = %definition.key(), "Chain reset");

        Ok(())
    }

    /// Fetch level `index` again for the current parent, bypassing the cache.
    /// A selection still present in the new options is kept.
    pub async fn refresh_level(&self, index: usize) -> Result<SelectOutcome, DomainError> {
        let pending = {
            let mut state = self.lock()?;
            self.ensure_open(&state)?;
            let definition = self.level_definition(index)?;

            let parent = match state.parent_state(index) {
                None => None,
                Some(parent) => match parent.selection.clone() {
                    Some(selection) => Some(selection),
                    None => {
                        return Err(DomainError::invalid_selection_order(
                            definition.key().as_str(),
                            self.definition.levels()[index - 1].key().as_str(),
                        ));
                    }
                },
            };

            if index == 0 {
                state.root_requested = true;
            }

            state.cache.remove(index);
            state.begin_fetch(index, parent)
        };

        self.run_fetch(pending).await
    }

    pub fn level_state(&self, index: usize) -> Result<LevelState, DomainError> {
        let state = self.lock()?;
        self.level_definition(index)?;
        Ok(state.stores[index].snapshot())
    }

    pub fn snapshot(&self) -> Result<Vec<LevelState>, DomainError> {
        let state = self.lock()?;
        Ok(state.stores.iter().map(LevelStore::snapshot).collect())
    }

    pub fn selected_label(&self, index: usize) -> Result<Option<String>, DomainError> {
        let state = self.lock()?;
        self.level_definition(index)?;
        Ok(state.stores[index].state().selected_label().map(str::to_string))
    }

    /// Present one level. Re-rendering an unchanged empty level does not
    /// notify again.
    pub fn render_level(&self, index: usize) -> Result<LevelView, DomainError> {
        let (view, event) = {
            let mut state = self.lock()?;
            self.level_definition(index)?;
            self.view_of(&mut state, index)
        };

        self.emit(event);
        Ok(view)
    }

    pub fn render(&self) -> Result<Vec<LevelView>, DomainError> {
        let (views, events): (Vec<_>, Vec<_>) = {
            let mut state = self.lock()?;
            let rendered = (0..self.definition.len())
                .map(|index| self.view_of(&mut state, index))
                .unzip();
            rendered
        };

        for event in events {
            self.emit(event);
        }

        Ok(views)
    }

    pub fn stats(&self) -> Result<ResolverStats, DomainError> {
        Ok(self.lock()?.stats.clone())
    }

    /// Discard the chain; responses still in flight become no-ops
    pub fn close(&self) -> Result<(), DomainError> {
        let mut state = self.lock()?;

        if !state.closed {
            state.closed = true;
            state.in_flight.iter_mut().for_each(|tag| *tag = None);
            state.cache.clear();
            info!(chain_id = %self.id, "Chain closed");
        }

        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().map(|s| s.closed).unwrap_or(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChainState>, DomainError> {
        self.state
            .lock()
            .map_err(|e| DomainError::internal(format!("Failed to acquire chain lock: {}", e)))
    }

    fn ensure_open(&self, state: &ChainState) -> Result<(), DomainError> {
        if state.closed {
            return Err(DomainError::chain_closed(self.id.to_string()));
        }

        Ok(())
    }

    fn level_definition(&self, index: usize) -> Result<&LevelDefinition, DomainError> {
        self.definition
            .level(index)
            .ok_or_else(|| DomainError::level_out_of_range(index, self.definition.len()))
    }

    /// Serve `level` from the cache or start a fetch for it
    fn plan_load(&self, state: &mut ChainState, level: usize, parent: String) -> LoadPlan {
        if self.config.cache_options {
            if let Some(cached) = state.cache.get(level, Some(parent.as_str())).map(<[_]>::to_vec) {
                let count = cached.len();
                state.stores[level].complete_load(cached);
                state.stats.cache_hits += 1;

                debug!(
                    chain_id = %self.id,
                    level = %self.definition.levels()[level].key(),
                    parent = %parent,
                    count,
                    "Options served from cache"
                );

                let event = self.observe(state, level);
                return LoadPlan::Done(
                    SelectOutcome::Loaded {
                        level,
                        count,
                        cached: true,
                    },
                    event,
                );
            }
        }

        LoadPlan::Fetch(state.begin_fetch(level, Some(parent)))
    }

    async fn run_fetch(&self, pending: PendingFetch) -> Result<SelectOutcome, DomainError> {
        let PendingFetch { level, tag } = pending;
        let key = self.definition.levels()[level].key();

        let result = self.fetcher.fetch(key, tag.parent.as_deref()).await;

        let (outcome, event) = {
            let mut state = self.lock()?;

            if state.closed || state.in_flight[level].as_ref() != Some(&tag) {
                state.stats.stale_responses_discarded += 1;
                debug!(
                    chain_id = %self.id,
                    level = %key,
                    ticket = tag.ticket,
                    parent = ?tag.parent,
                    "Stale response discarded"
                );
                return Ok(SelectOutcome::StaleResponseDiscarded { level });
            }

            state.in_flight[level] = None;

            let outcome = match result {
                Ok(options) => {
                    let count = options.len();

                    if self.config.cache_options {
                        state
                            .cache
                            .insert(level, tag.parent.as_deref(), options.clone());
                    }

                    state.stores[level].complete_load(options);
                    debug!(chain_id = %self.id, level = %key, count, "Level loaded");

                    SelectOutcome::Loaded {
                        level,
                        count,
                        cached: false,
                    }
                }
                Err(e) => {
                    state.stats.fetches_failed += 1;
                    state.stores[level].complete_load(Vec::new());
                    warn!(chain_id = %self.id, level = %key, error = %e, "Level fetch failed");

                    SelectOutcome::FetchFailed {
                        level,
                        message: e.to_string(),
                    }
                }
            };

            self.drop_vanished_selection(&mut state, level);

            (outcome, self.observe(&mut state, level))
        };

        self.emit(event);
        Ok(outcome)
    }

    /// A selection that is no longer among the options is cleared together
    /// with everything that depended on it
    fn drop_vanished_selection(&self, state: &mut ChainState, level: usize) {
        let current = state.stores[level].state();

        let vanished = match current.selection.as_deref() {
            Some(selection) => !current.contains(selection),
            None => false,
        };

        if vanished {
            debug!(
                chain_id = %self.id,
                level = %self.definition.levels()[level].key(),
                "Selection no longer available, clearing"
            );
            state.stores[level].set_selection(None);
            state.reset_below(level);
            state.cache.invalidate_below(level);
        }
    }

    fn observe(&self, state: &mut ChainState, level: usize) -> Option<NotificationEvent> {
        let definition = &self.definition.levels()[level];
        let parent = level.checked_sub(1).map(|p| state.stores[p].state());
        let event = state.guards[level].observe(state.stores[level].state(), parent, definition);

        if event.is_some() {
            state.stats.notifications_emitted += 1;
        }

        event
    }

    fn view_of(
        &self,
        state: &mut ChainState,
        index: usize,
    ) -> (LevelView, Option<NotificationEvent>) {
        let definition = &self.definition.levels()[index];
        let view = present_level(
            index,
            state.stores[index].state(),
            state.parent_state(index),
            definition,
        );

        (view, self.observe(state, index))
    }

    fn emit(&self, event: Option<NotificationEvent>) {
        if let Some(event) = event {
            info!(
                chain_id = %self.id,
                level = %event.level_key,
                parent = ?event.parent_label,
                "Empty level reported"
            );
            self.notifier.notify_empty_level(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::selection::fetcher::mock::MockLevelFetcher;
    use crate::domain::selection::notifier::mock::RecordingNotifier;
    use crate::domain::selection::notifier::MockEmptyLevelNotifier;
    use crate::domain::selection::presenter::RenderMode;
    use crate::domain::selection::SelectOption;
    use tokio_test::{assert_pending, assert_ready, task};

    fn portal_chain() -> ChainDefinition {
        ChainDefinition::linear([
            ("company", false),
            ("branch", true),
            ("area", true),
            ("manager", true),
        ])
        .unwrap()
    }

    fn companies() -> Vec<SelectOption> {
        vec![SelectOption::new("1", "Acme"), SelectOption::new("2", "Globex")]
    }

    fn branches() -> Vec<SelectOption> {
        vec![SelectOption::new("10", "North"), SelectOption::new("11", "South")]
    }

    fn portal_fetcher() -> MockLevelFetcher {
        MockLevelFetcher::new()
            .with_options("company", None, companies())
            .with_options("branch", Some("1"), branches())
            .with_options("branch", Some("2"), vec![SelectOption::new("20", "East")])
            .with_options("area", Some("10"), vec![SelectOption::new("100", "Sales")])
            .with_options("manager", Some("100"), vec![SelectOption::new("m1", "Dana")])
    }

    fn resolver_with(
        fetcher: Arc<MockLevelFetcher>,
        notifier: Arc<RecordingNotifier>,
    ) -> ChainResolver {
        ChainResolver::new(
            portal_chain(),
            fetcher,
            notifier,
            ChainResolverConfig::default(),
        )
    }

    async fn opened(
        fetcher: Arc<MockLevelFetcher>,
        notifier: Arc<RecordingNotifier>,
    ) -> ChainResolver {
        let resolver = resolver_with(fetcher, notifier);
        resolver.initialize().await.unwrap();
        resolver
    }

    #[tokio::test]
    async fn test_root_loads_on_creation() {
        let fetcher = Arc::new(
            MockLevelFetcher::new()
                .with_options("company", None, vec![SelectOption::new("1", "Acme")]),
        );
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = resolver_with(fetcher.clone(), notifier.clone());

        let root = resolver.level_state(0).unwrap();
        assert!(root.loading);
        assert!(root.options.is_empty());

        let outcome = resolver.initialize().await.unwrap();
        assert_eq!(
            outcome,
            SelectOutcome::Loaded {
                level: 0,
                count: 1,
                cached: false
            }
        );

        let root = resolver.level_state(0).unwrap();
        assert!(!root.loading);
        assert_eq!(root.options, vec![SelectOption::new("1", "Acme")]);

        assert_eq!(resolver.initialize().await.unwrap(), SelectOutcome::Unchanged);
        assert_eq!(fetcher.call_count("company"), 1);
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_empty_root_notifies() {
        let fetcher = Arc::new(MockLevelFetcher::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let _resolver = opened(fetcher, notifier.clone()).await;

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level_key, "company");
        assert_eq!(events[0].parent_label, None);
    }

    #[tokio::test]
    async fn test_child_before_parent_is_rejected() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier).await;
        let before = resolver.snapshot().unwrap();

        for index in 1..4 {
            let result = resolver.select_level(index, "10").await;
            assert!(matches!(
                result,
                Err(DomainError::InvalidSelectionOrder { .. })
            ));
        }

        assert_eq!(resolver.snapshot().unwrap(), before);
        assert_eq!(fetcher.call_count("branch"), 0);
    }

    #[tokio::test]
    async fn test_select_loads_child_and_resets_descendants() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier.clone()).await;

        resolver.select_level(0, "1").await.unwrap();
        resolver.select_level(1, "10").await.unwrap();
        resolver.select_level(2, "100").await.unwrap();
        resolver.select_level(3, "m1").await.unwrap();

        let outcome = resolver.select_level(0, "2").await.unwrap();
        assert_eq!(
            outcome,
            SelectOutcome::Loaded {
                level: 1,
                count: 1,
                cached: false
            }
        );

        let states = resolver.snapshot().unwrap();
        assert_eq!(states[0].selection.as_deref(), Some("2"));
        assert_eq!(states[1].selection, None);
        assert_eq!(states[1].options, vec![SelectOption::new("20", "East")]);
        assert_eq!(states[2], LevelState::default());
        assert_eq!(states[3], LevelState::default());
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_descendants_reset_before_fetch_resolves() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier).await;

        resolver.select_level(0, "1").await.unwrap();
        resolver.select_level(1, "10").await.unwrap();

        let gate = fetcher.gate("branch", Some("2"));
        let mut select = task::spawn(resolver.select_level(0, "2"));
        assert_pending!(select.poll());

        let states = resolver.snapshot().unwrap();
        assert!(states[1].loading);
        assert_eq!(states[1].selection, None);
        assert!(states[1].options.is_empty());
        assert_eq!(states[2], LevelState::default());

        gate.send(Ok(vec![SelectOption::new("20", "East")])).unwrap();
        let outcome = assert_ready!(select.poll()).unwrap();
        assert!(matches!(outcome, SelectOutcome::Loaded { level: 1, .. }));
    }

    #[tokio::test]
    async fn test_same_selection_does_not_refetch() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier).await;

        resolver.select_level(0, "1").await.unwrap();
        let outcome = resolver.select_level(0, "1").await.unwrap();

        assert_eq!(outcome, SelectOutcome::Unchanged);
        assert_eq!(fetcher.call_count("branch"), 1);
    }

    #[tokio::test]
    async fn test_unknown_option_is_rejected() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher, notifier).await;

        let result = resolver.select_level(0, "99").await;

        assert!(matches!(result, Err(DomainError::UnknownOption { .. })));
        assert_eq!(resolver.level_state(0).unwrap().selection, None);
    }

    #[tokio::test]
    async fn test_select_while_loading_is_rejected() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = resolver_with(fetcher, notifier);

        let result = resolver.select_level(0, "1").await;
        assert!(matches!(result, Err(DomainError::LevelLoading { .. })));
    }

    #[tokio::test]
    async fn test_out_of_range() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher, notifier).await;

        assert!(matches!(
            resolver.select_level(4, "x").await,
            Err(DomainError::LevelOutOfRange { index: 4, len: 4 })
        ));
        assert!(resolver.level_state(9).is_err());
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded_when_it_arrives_last() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier).await;

        let gate_one = fetcher.gate("branch", Some("1"));
        let gate_two = fetcher.gate("branch", Some("2"));

        let mut first = task::spawn(resolver.select_level(0, "1"));
        assert_pending!(first.poll());
        let mut second = task::spawn(resolver.select_level(0, "2"));
        assert_pending!(second.poll());

        gate_two
            .send(Ok(vec![SelectOption::new("20", "East")]))
            .unwrap();
        let outcome = assert_ready!(second.poll()).unwrap();
        assert!(matches!(outcome, SelectOutcome::Loaded { level: 1, .. }));

        gate_one.send(Ok(branches())).unwrap();
        let outcome = assert_ready!(first.poll()).unwrap();
        assert_eq!(outcome, SelectOutcome::StaleResponseDiscarded { level: 1 });

        let branch = resolver.level_state(1).unwrap();
        assert_eq!(branch.options, vec![SelectOption::new("20", "East")]);
        assert!(!branch.loading);
        assert_eq!(resolver.stats().unwrap().stale_responses_discarded, 1);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded_when_it_arrives_first() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier.clone()).await;

        let gate_one = fetcher.gate("branch", Some("1"));
        let gate_two = fetcher.gate("branch", Some("2"));

        let mut first = task::spawn(resolver.select_level(0, "1"));
        assert_pending!(first.poll());
        let mut second = task::spawn(resolver.select_level(0, "2"));
        assert_pending!(second.poll());

        gate_one.send(Ok(Vec::new())).unwrap();
        let outcome = assert_ready!(first.poll()).unwrap();
        assert_eq!(outcome, SelectOutcome::StaleResponseDiscarded { level: 1 });

        let branch = resolver.level_state(1).unwrap();
        assert!(branch.loading);
        assert!(notifier.events().is_empty());

        gate_two
            .send(Ok(vec![SelectOption::new("20", "East")]))
            .unwrap();
        assert_ready!(second.poll()).unwrap();

        let branch = resolver.level_state(1).unwrap();
        assert_eq!(branch.options, vec![SelectOption::new("20", "East")]);
    }

    #[tokio::test]
    async fn test_empty_required_child_notifies_once() {
        let fetcher = Arc::new(
            MockLevelFetcher::new().with_options("company", None, vec![SelectOption::new("1", "Acme")]),
        );

        let mut notifier = MockEmptyLevelNotifier::new();
        notifier
            .expect_notify_empty_level()
            .withf(|event| {
                event.level_key == "branch" && event.parent_label.as_deref() == Some("Acme")
            })
            .times(1)
            .return_const(());

        let resolver = ChainResolver::open(
            portal_chain(),
            fetcher,
            Arc::new(notifier),
            ChainResolverConfig::default(),
        )
        .await
        .unwrap();

        let outcome = resolver.select_level(0, "1").await.unwrap();
        assert_eq!(
            outcome,
            SelectOutcome::Loaded {
                level: 1,
                count: 0,
                cached: false
            }
        );

        let view = resolver.render_level(1).unwrap();
        assert_eq!(view.mode, RenderMode::EmptyNeedsAttention);
        resolver.render().unwrap();
        resolver.render().unwrap();
    }

    #[tokio::test]
    async fn test_no_notification_for_unselected_parent() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher, notifier.clone()).await;

        let views = resolver.render().unwrap();

        assert_eq!(views[0].mode, RenderMode::Normal);
        assert!(!views[0].disabled);
        assert!(views[1..].iter().all(|v| v.disabled));
        assert!(views[1..].iter().all(|v| v.mode == RenderMode::Normal));
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_notification_rearms_after_parent_change() {
        let fetcher = Arc::new(
            MockLevelFetcher::new().with_options("company", None, companies()),
        );
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher, notifier.clone()).await;

        resolver.select_level(0, "1").await.unwrap();
        resolver.select_level(0, "2").await.unwrap();
        resolver.render().unwrap();

        let events = notifier.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].parent_label.as_deref(), Some("Acme"));
        assert_eq!(events[1].parent_label.as_deref(), Some("Globex"));
    }

    #[tokio::test]
    async fn test_fetch_failure_resolves_to_empty() {
        let fetcher = Arc::new(
            MockLevelFetcher::new()
                .with_options("company", None, companies())
                .with_failure("branch", Some("1"), "HTTP 503"),
        );
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher, notifier.clone()).await;

        let outcome = resolver.select_level(0, "1").await.unwrap();

        assert!(matches!(
            outcome,
            SelectOutcome::FetchFailed { level: 1, ref message } if message.contains("HTTP 503")
        ));

        let branch = resolver.level_state(1).unwrap();
        assert!(!branch.loading);
        assert!(branch.options.is_empty());

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level_key, "branch");
        assert_eq!(resolver.stats().unwrap().fetches_failed, 1);
    }

    #[tokio::test]
    async fn test_loading_keeps_previous_options() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier).await;
        resolver.select_level(0, "1").await.unwrap();

        let gate = fetcher.gate("branch", Some("1"));
        let mut refresh = task::spawn(resolver.refresh_level(1));
        assert_pending!(refresh.poll());

        let branch = resolver.level_state(1).unwrap();
        assert!(branch.loading);
        assert_eq!(branch.options, branches());

        gate.send(Ok(branches())).unwrap();
        assert_ready!(refresh.poll()).unwrap();
        assert!(!resolver.level_state(1).unwrap().loading);
    }

    #[tokio::test]
    async fn test_refresh_preserves_matching_selection() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier).await;

        resolver.select_level(0, "1").await.unwrap();
        resolver.select_level(1, "10").await.unwrap();
        resolver.select_level(2, "100").await.unwrap();

        fetcher.set_options(
            "branch",
            Some("1"),
            vec![SelectOption::new("10", "North (renamed)")],
        );
        resolver.refresh_level(1).await.unwrap();

        let states = resolver.snapshot().unwrap();
        assert_eq!(states[1].selection.as_deref(), Some("10"));
        assert_eq!(states[1].selected_label(), Some("North (renamed)"));
        assert_eq!(states[2].selection.as_deref(), Some("100"));
        assert_eq!(fetcher.call_count("branch"), 2);
    }

    #[tokio::test]
    async fn test_refresh_clears_vanished_selection() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier).await;

        resolver.select_level(0, "1").await.unwrap();
        resolver.select_level(1, "10").await.unwrap();

        fetcher.set_options("branch", Some("1"), vec![SelectOption::new("11", "South")]);
        resolver.refresh_level(1).await.unwrap();

        let states = resolver.snapshot().unwrap();
        assert_eq!(states[1].selection, None);
        assert_eq!(states[2], LevelState::default());
    }

    #[tokio::test]
    async fn test_switching_back_to_previous_parent_fetches_again() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier).await;

        resolver.select_level(0, "1").await.unwrap();
        fetcher.set_options("branch", Some("1"), vec![SelectOption::new("99", "New")]);
        resolver.select_level(0, "2").await.unwrap();
        let outcome = resolver.select_level(0, "1").await.unwrap();

        assert_eq!(
            outcome,
            SelectOutcome::Loaded {
                level: 1,
                count: 1,
                cached: false
            }
        );
        assert_eq!(fetcher.call_count("branch"), 3);
        assert_eq!(
            resolver.level_state(1).unwrap().options,
            vec![SelectOption::new("99", "New")]
        );
        assert_eq!(resolver.stats().unwrap().cache_hits, 0);
    }

    #[tokio::test]
    async fn test_cache_holds_one_entry_per_level() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher, notifier).await;

        for _ in 0..5 {
            resolver.select_level(0, "1").await.unwrap();
            resolver.select_level(0, "2").await.unwrap();
        }

        let state = resolver.lock().unwrap();
        assert_eq!(state.cache.len(), 2);
        assert!(state.cache.get(1, Some("2")).is_some());
        assert!(state.cache.get(1, Some("1")).is_none());
    }

    #[tokio::test]
    async fn test_reselecting_cleared_parent_is_served_from_cache() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier).await;

        resolver.select_level(0, "1").await.unwrap();
        resolver.reset_from(0).unwrap();
        let outcome = resolver.select_level(0, "1").await.unwrap();

        assert_eq!(
            outcome,
            SelectOutcome::Loaded {
                level: 1,
                count: 2,
                cached: true
            }
        );
        assert_eq!(fetcher.call_count("branch"), 1);
        assert_eq!(resolver.level_state(1).unwrap().options, branches());
        assert_eq!(resolver.stats().unwrap().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_cache_can_be_disabled() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = ChainResolver::open(
            portal_chain(),
            fetcher.clone(),
            notifier,
            ChainResolverConfig {
                cache_options: false,
            },
        )
        .await
        .unwrap();

        resolver.select_level(0, "1").await.unwrap();
        resolver.select_level(0, "2").await.unwrap();
        resolver.select_level(0, "1").await.unwrap();

        assert_eq!(fetcher.call_count("branch"), 3);
    }

    #[tokio::test]
    async fn test_reset_from_keeps_level_options() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher, notifier).await;

        resolver.select_level(0, "1").await.unwrap();
        resolver.select_level(1, "10").await.unwrap();

        resolver.reset_from(0).unwrap();

        let states = resolver.snapshot().unwrap();
        assert_eq!(states[0].selection, None);
        assert_eq!(states[0].options, companies());
        assert_eq!(states[1], LevelState::default());
        assert_eq!(states[2], LevelState::default());
    }

    #[tokio::test]
    async fn test_clear_selection_with_empty_value() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher, notifier).await;

        resolver.select_level(0, "1").await.unwrap();
        let outcome = resolver.select_level(0, "").await.unwrap();

        assert_eq!(outcome, SelectOutcome::Settled { level: 0 });
        assert_eq!(resolver.level_state(1).unwrap(), LevelState::default());
    }

    #[tokio::test]
    async fn test_select_path_restores_record() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = resolver_with(fetcher, notifier);

        let outcomes = resolver
            .select_path(&["1", "10", "100", "m1"])
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[3], SelectOutcome::Settled { level: 3 });
        assert_eq!(resolver.selected_label(3).unwrap().as_deref(), Some("Dana"));
    }

    #[tokio::test]
    async fn test_select_path_stops_at_empty_level() {
        let fetcher = Arc::new(
            MockLevelFetcher::new()
                .with_options("company", None, companies())
                .with_options("branch", Some("1"), Vec::new()),
        );
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = resolver_with(fetcher.clone(), notifier);

        let outcomes = resolver.select_path(&["1", "10", "100"]).await.unwrap();

        assert_eq!(
            outcomes,
            vec![SelectOutcome::Loaded {
                level: 1,
                count: 0,
                cached: false
            }]
        );
        assert_eq!(resolver.level_state(0).unwrap().selection.as_deref(), Some("1"));
        assert_eq!(resolver.level_state(1).unwrap().selection, None);
        assert_eq!(fetcher.call_count("area"), 0);
    }

    #[tokio::test]
    async fn test_select_key() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher, notifier).await;

        resolver.select_key("company", "1").await.unwrap();
        assert_eq!(resolver.selected_label(0).unwrap().as_deref(), Some("Acme"));

        assert!(matches!(
            resolver.select_key("card", "1").await,
            Err(DomainError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_drops_late_response() {
        let fetcher = Arc::new(portal_fetcher());
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = opened(fetcher.clone(), notifier.clone()).await;

        let gate = fetcher.gate("branch", Some("1"));
        let mut select = task::spawn(resolver.select_level(0, "1"));
        assert_pending!(select.poll());

        resolver.close().unwrap();
        gate.send(Ok(Vec::new())).unwrap();

        let outcome = assert_ready!(select.poll()).unwrap();
        assert_eq!(outcome, SelectOutcome::StaleResponseDiscarded { level: 1 });
        assert!(notifier.events().is_empty());
        assert!(resolver.is_closed());
        assert_eq!(resolver.lock().unwrap().cache.len(), 0);
        assert!(matches!(
            resolver.select_level(0, "2").await,
            Err(DomainError::ChainClosed { .. })
        ));
    }
}
