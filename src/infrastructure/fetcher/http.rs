//! REST-backed level fetcher

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::config::{EndpointConfig, HttpFetcherConfig};
use crate::domain::{DomainError, LevelFetcher, LevelKey, SelectOption};

const PARENT_PLACEHOLDER: &str = "{parent}";

/// Fetches level options with `GET base_url + endpoint.path`.
///
/// The response must be a JSON array of objects; `value_field` and
/// `label_field` pick the option fields.
#[derive(Debug, Clone)]
pub struct HttpLevelFetcher {
    client: reqwest::Client,
    base_url: Url,
    endpoints: HashMap<String, EndpointConfig>,
}

impl HttpLevelFetcher {
    pub fn new(config: &HttpFetcherConfig) -> Result<Self, DomainError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DomainError::configuration(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(DomainError::configuration(format!(
                "Base URL '{}' cannot carry a path",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            endpoints: config.endpoints.clone(),
        })
    }

    fn endpoint(&self, level: &LevelKey) -> Result<&EndpointConfig, DomainError> {
        self.endpoints.get(level.as_str()).ok_or_else(|| {
            DomainError::fetch_failed(level.as_str(), "No endpoint configured for level")
        })
    }

    /// Append the endpoint path to the base URL, percent-encoding the parent value
    fn build_url(
        &self,
        level: &LevelKey,
        endpoint: &EndpointConfig,
        parent: Option<&str>,
    ) -> Result<Url, DomainError> {
        let mut url = self.base_url.clone();
        let mut parent_used = false;

        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                DomainError::fetch_failed(level.as_str(), "Base URL cannot carry a path")
            })?;
            segments.pop_if_empty();

            for segment in endpoint.path.split('/').filter(|s| !s.is_empty()) {
                if segment == PARENT_PLACEHOLDER {
                    let value = parent.ok_or_else(|| {
                        DomainError::fetch_failed(level.as_str(), "Endpoint needs a parent value")
                    })?;
                    segments.push(value);
                    parent_used = true;
                } else {
                    segments.push(segment);
                }
            }
        }

        if let (Some(value), false) = (parent, parent_used) {
            url.query_pairs_mut().append_pair("parent", value);
        }

        Ok(url)
    }
}

fn field_as_string(item: &Value, field: &str) -> Option<String> {
    match item.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Map a JSON array payload to options
fn parse_options(
    level: &LevelKey,
    endpoint: &EndpointConfig,
    payload: Value,
) -> Result<Vec<SelectOption>, DomainError> {
    let Value::Array(items) = payload else {
        return Err(DomainError::fetch_failed(
            level.as_str(),
            "Expected a JSON array",
        ));
    };

    items
        .iter()
        .map(|item| {
            let value = field_as_string(item, &endpoint.value_field);
            let label = field_as_string(item, &endpoint.label_field);

            match (value, label) {
                (Some(value), Some(label)) => Ok(SelectOption { value, label }),
                _ => Err(DomainError::fetch_failed(
                    level.as_str(),
                    format!(
                        "Item is missing '{}' or '{}'",
                        endpoint.value_field, endpoint.label_field
                    ),
                )),
            }
        })
        .collect()
}

#[async_trait]
impl LevelFetcher for HttpLevelFetcher {
    async fn fetch(
        &self,
        level_key: &LevelKey,
        parent_value: Option<&str>,
    ) -> Result<Vec<SelectOption>, DomainError> {
        let endpoint = self.endpoint(level_key)?;
        let url = self.build_url(level_key, endpoint, parent_value)?;

        tracing::debug!(level = %level_key, url = %url, "Fetching level options");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::fetch_failed(level_key.as_str(), format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::fetch_failed(
                level_key.as_str(),
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        let payload: Value = response.json().await.map_err(|e| {
            DomainError::fetch_failed(
                level_key.as_str(),
                format!("Failed to parse response: {}", e),
            )
        })?;

        parse_options(level_key, endpoint, payload)
    }
}
