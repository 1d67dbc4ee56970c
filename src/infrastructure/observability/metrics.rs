//! Prometheus metrics for selection chains

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;
use crate::domain::selection::ResolverStats;

/// Handle on the installed Prometheus recorder
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Metrics in Prometheus text exposition format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the Prometheus recorder
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("cascade_select_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::debug!("Prometheus recorder installed");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Record one level fetch
pub fn record_fetch(level: &str, success: bool, duration: Duration) {
    let labels = [
        ("level", level.to_string()),
        ("status", if success { "success" } else { "error" }.to_string()),
    ];

    counter!("cascade_fetches_total", &labels).increment(1);
    histogram!("cascade_fetch_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record an empty-level notification
pub fn record_empty_notification(level: &str) {
    counter!("cascade_empty_notifications_total", "level" => level.to_string()).increment(1);
}

/// Publish the counters a resolver kept for its lifetime
pub fn record_resolver_stats(stats: &ResolverStats) {
    counter!("cascade_cache_hits_total").absolute(stats.cache_hits);
    counter!("cascade_stale_responses_total").absolute(stats.stale_responses_discarded);
    counter!("cascade_failed_fetches_total").absolute(stats.fetches_failed);
}
