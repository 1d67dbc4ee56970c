//! In-memory level fetcher backed by a static catalog

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{DomainError, LevelFetcher, LevelKey, SelectOption};

/// Options per level and parent value. The root level is stored under the
/// empty parent key.
///
/// ```json
/// { "company": { "": [{"value": "1", "label": "Acme"}] },
///   "branch":  { "1": [{"value": "10", "label": "North"}] } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LevelCatalog {
    levels: HashMap<String, HashMap<String, Vec<SelectOption>>>,
}

impl LevelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(
        mut self,
        level: &str,
        parent: Option<&str>,
        options: Vec<SelectOption>,
    ) -> Self {
        self.levels
            .entry(level.to_string())
            .or_default()
            .insert(parent.unwrap_or_default().to_string(), options);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        serde_json::from_str(json)
            .map_err(|e| DomainError::configuration(format!("Invalid level catalog: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read level catalog '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&content)
    }

    pub fn options(&self, level: &str, parent: Option<&str>) -> Option<&[SelectOption]> {
        self.levels
            .get(level)?
            .get(parent.unwrap_or_default())
            .map(Vec::as_slice)
    }
}

/// Fetcher answering from a [`LevelCatalog`]; unknown keys yield no options
#[derive(Debug, Default)]
pub struct InMemoryLevelFetcher {
    catalog: LevelCatalog,
}

impl InMemoryLevelFetcher {
    pub fn new(catalog: LevelCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl LevelFetcher for InMemoryLevelFetcher {
    async fn fetch(
        &self,
        level_key: &LevelKey,
        parent_value: Option<&str>,
    ) -> Result<Vec<SelectOption>, DomainError> {
        Ok(self
            .catalog
            .options(level_key.as_str(), parent_value)
            .map(<[_]>::to_vec)
            .unwrap_or_default())
    }
}
