//! Cascading selection domain - levels, stores, presenter and the chain resolver

mod cache;
mod fetcher;
mod level;
mod notifier;
mod presenter;
mod resolver;
mod store;
mod validation;

pub use cache::OptionCache;
pub use fetcher::LevelFetcher;
pub use level::{ChainDefinition, LevelDefinition, LevelKey, SelectOption};
pub use notifier::{EmptyLevelNotifier, NotificationEvent};
pub use presenter::{
    compute_notification, present_level, EmptyMark, LevelView, NotificationGuard, RenderMode,
};
pub use resolver::{ChainResolver, ChainResolverConfig, ResolverStats, SelectOutcome};
pub use store::{LevelState, LevelStore};
pub use validation::{validate_level_key, LevelValidationError, MAX_LEVEL_KEY_LENGTH};

#[cfg(test)]
pub use fetcher::mock;
