//! Domain layer - Selection chain model and resolver

pub mod error;
pub mod selection;

pub use error::DomainError;
pub use selection::{
    ChainDefinition, ChainResolver, ChainResolverConfig, EmptyLevelNotifier, LevelDefinition,
    LevelFetcher, LevelKey, LevelState, LevelView, NotificationEvent, RenderMode, SelectOption,
    SelectOutcome,
};
