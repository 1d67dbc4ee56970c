//! Level fetcher port

use async_trait::async_trait;

use super::level::{LevelKey, SelectOption};
use crate::domain::DomainError;

/// Loads the options of one level for a parent value.
///
/// Implementations are read-only against their backing store. Any error is
/// treated by the resolver as a failed fetch; HTTP status is not distinguished.
#[async_trait]
pub trait LevelFetcher: Send + Sync + std::fmt::Debug {
    /// `parent_value` is `None` for the root level
    async fn fetch(
        &self,
        level_key: &LevelKey,
        parent_value: Option<&str>,
    ) -> Result<Vec<SelectOption>, DomainError>;
}
