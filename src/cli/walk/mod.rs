//! Walk command - drives a selection chain from the command line

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;
use serde_json::json;
use tracing::info;

use super::bootstrap;
use crate::config::FetcherKind;
use crate::domain::{ChainResolver, ChainResolverConfig};
use crate::infrastructure::fetcher::create_fetcher;
use crate::infrastructure::notifier::ChannelNotifier;
use crate::infrastructure::observability::{init_metrics, record_resolver_stats, shutdown_tracing};

#[derive(Args, Debug)]
pub struct WalkArgs {
    /// Selection as `level=value`, applied in the order given
    #[arg(short, long = "select", value_name = "LEVEL=VALUE")]
    pub selections: Vec<String>,

    /// Use this JSON catalog instead of the configured fetcher
    #[arg(long)]
    pub catalog: Option<String>,

    /// Print Prometheus metrics after the chain output
    #[arg(long)]
    pub print_metrics: bool,
}

fn parse_selection(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once('=').map(|(level, value)| (level.trim(), value.trim())) {
        Some((level, value)) if !level.is_empty() => Ok((level, value)),
        _ => bail!("Invalid selection '{}': expected LEVEL=VALUE", raw),
    }
}

pub async fn run(args: WalkArgs) -> anyhow::Result<()> {
    let mut config = bootstrap();

    if let Some(catalog) = args.catalog {
        config.fetcher.kind = FetcherKind::Memory;
        config.fetcher.catalog_path = Some(catalog);
    }

    let metrics = init_metrics(&config.observability.metrics);
    let definition = config.chain.to_definition()?;
    let fetcher = create_fetcher(&config.fetcher)?;
    let (notifier, mut notifications) = ChannelNotifier::new();

    let resolver = ChainResolver::new(
        definition,
        fetcher,
        Arc::new(notifier),
        ChainResolverConfig {
            cache_options: config.chain.cache_options,
        },
    );

    info!(chain_id = %resolver.id(), "Walking selection chain");

    let mut outcomes = vec![resolver.initialize().await?];

    for raw in &args.selections {
        let (level, value) = parse_selection(raw)?;
        let outcome = resolver
            .select_key(level, value)
            .await
            .with_context(|| format!("Selecting {}", raw))?;
        outcomes.push(outcome);
    }

    let levels = resolver.render()?;
    let stats = resolver.stats()?;
    record_resolver_stats(&stats);

    let chain_id = resolver.id();
    resolver.close()?;
    drop(resolver);

    let mut reported = Vec::new();
    while let Ok(message) = notifications.try_recv() {
        reported.push(message);
    }

    let output = json!({
        "chain_id": chain_id,
        "outcomes": outcomes,
        "levels": levels,
        "notifications": reported,
        "stats": stats,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    if args.print_metrics {
        if let Some(metrics) = metrics {
            println!("{}", metrics.render());
        }
    }

    shutdown_tracing();

    Ok(())
}
