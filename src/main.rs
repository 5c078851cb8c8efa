// ██╗     ██╗███████╗████████╗██╗███╗   ██╗ ██████╗
// ██║     ██║██╔════╝╚══██╔══╝██║████╗  ██║██╔════╝
// ██║     ██║███████╗   ██║   ██║██╔██╗ ██║██║  ███╗
// ██║     ██║╚════██║   ██║   ██║██║╚██╗██║██║   ██║
// ███████╗██║███████║   ██║   ██║██║ ╚████║╚██████╔╝
// ╚══════╝╚═╝╚══════╝   ╚═╝   ╚═╝╚═╝  ╚═══╝ ╚═════╝
//
// R A D A R
//
// One pass over four exchange help desks, one Telegram message if anything
// new got listed, one seen-set written back. Scheduling the next pass is
// cron's job.

mod aggregator;
mod classifier;
mod collector;
mod config;
mod error;
mod fetcher;
mod html;
mod metrics;
mod models;
mod notifier;
mod seen_store;
mod sources;
mod timestamp;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::aggregator::Aggregator;
use crate::classifier::Classifier;
use crate::config::Config;
use crate::fetcher::{DocumentFetcher, HttpFetcher};
use crate::metrics::RunStats;
use crate::notifier::{Notifier, TelegramNotifier};
use crate::seen_store::{FileSeenStore, RedisSeenStore, SeenStore};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }
}

fn build_store(config: &Config) -> anyhow::Result<Arc<dyn SeenStore>> {
    Ok(match &config.redis_url {
        Some(url) => Arc::new(
            RedisSeenStore::new(url, config.redis_key.clone()).context("invalid LISTING_RADAR_REDIS_URL")?,
        ),
        None => Arc::new(FileSeenStore::new(config.seen_path.clone())),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing first, so warnings about rejected settings are not lost.
    let _ = dotenvy::dotenv();
    init_tracing(config::log_json_requested());
    let config = Config::from_env();

    info!(
        recent_hours = config.recent_hours,
        timeout_secs = config.request_timeout.as_secs(),
        sources = config.sources.len(),
        keywords = config.keywords.len(),
        "📡 Listing radar starting"
    );

    let fetcher: Arc<dyn DocumentFetcher> = Arc::new(
        HttpFetcher::new(config.request_timeout, &config.user_agent).context("building HTTP client")?,
    );
    let classifier = Arc::new(
        Classifier::new(config.keywords.as_slice()).context("building keyword automaton")?,
    );
    let store = build_store(&config)?;
    info!(store = %store.describe(), "Seen-set backend selected");
    let notifier: Arc<dyn Notifier> =
        Arc::new(TelegramNotifier::from_config(&config).context("building Telegram client")?);
    let stats = Arc::new(RunStats::new());

    let aggregator = Aggregator::new(&config, fetcher, classifier, store, notifier, stats.clone());
    let report = aggregator.run().await;

    for ann in &report.fresh {
        info!(exchange = %ann.exchange, url = %ann.url, "🚨 {}", ann);
    }
    info!(summary = %stats.summary_json(), "Run complete");
    Ok(())
}
