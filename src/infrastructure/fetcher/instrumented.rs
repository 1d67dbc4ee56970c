//! Fetcher decorator recording latency and outcome metrics

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::domain::{DomainError, LevelFetcher, LevelKey, SelectOption};
use crate::infrastructure::observability::record_fetch;

#[derive(Debug)]
pub struct InstrumentedFetcher {
    inner: Arc<dyn LevelFetcher>,
}

impl InstrumentedFetcher {
    pub fn new(inner: Arc<dyn LevelFetcher>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LevelFetcher for InstrumentedFetcher {
    async fn fetch(
        &self,
        level_key: &LevelKey,
        parent_value: Option<&str>,
    ) -> Result<Vec<SelectOption>, DomainError> {
        let start = Instant::now();
        let result = self.inner.fetch(level_key, parent_value).await;
        let elapsed = start.elapsed();

        record_fetch(level_key.as_str(), result.is_ok(), elapsed);

        if let Ok(options) = &result {
            tracing::debug!(
                level = %level_key,
                parent = ?parent_value,
                count = options.len(),
                latency_ms = elapsed.as_millis() as u64,
                "Level fetch completed"
            );
        }

        result
    }
}
