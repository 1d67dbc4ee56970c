//! Fetcher factory for creating fetchers from configuration

use std::sync::Arc;

use super::{HttpLevelFetcher, InMemoryLevelFetcher, InstrumentedFetcher, LevelCatalog};
use crate::config::{FetcherConfig, FetcherKind};
use crate::domain::{DomainError, LevelFetcher};

/// Create the configured fetcher, wrapped with metrics
pub fn create_fetcher(config: &FetcherConfig) -> Result<Arc<dyn LevelFetcher>, DomainError> {
    let fetcher: Arc<dyn LevelFetcher> = match config.kind {
        FetcherKind::Memory => {
            let catalog = match &config.catalog_path {
                Some(path) => LevelCatalog::from_file(path)?,
                None => {
                    tracing::warn!("No catalog configured, every level will be empty");
                    LevelCatalog::new()
                }
            };
            Arc::new(InMemoryLevelFetcher::new(catalog))
        }
        FetcherKind::Http => {
            tracing::info!(base_url = %config.http.base_url, "Using HTTP level fetcher");
            Arc::new(HttpLevelFetcher::new(&config.http)?)
        }
    };

    Ok(Arc::new(InstrumentedFetcher::new(fetcher)))
}
