// =============================================================================
// aggregator.rs — ONE PASS, START TO FINISH
// =============================================================================
//
// The orchestration of a single run:
//
//   cutoff = now - recent window
//   load the seen-set
//   run every collector (each in its own task, so a panic stays contained)
//   keep what is recent and unseen, newest first
//   one batched notification if anything survived
//   persist the seen-set, always
//
// Collectors never touch the seen-set. Membership is decided here, after every
// collector has returned, in the fixed source order. That is the only shared
// mutable state in the process.
// =============================================================================

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::classifier::Classifier;
use crate::collector::Collector;
use crate::config::Config;
use crate::fetcher::DocumentFetcher;
use crate::metrics::RunStats;
use crate::models::{Announcement, Exchange};
use crate::notifier::{self, DeliveryStatus, Notifier};
use crate::seen_store::{SeenSet, SeenStore};

/// What a pass did, for the caller's final log line and for tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub fresh: Vec<Announcement>,
    /// `None` when nothing was fresh or delivery failed.
    pub delivery: Option<DeliveryStatus>,
}

pub struct Aggregator {
    collectors: Vec<Arc<Collector>>,
    store: Arc<dyn SeenStore>,
    notifier: Arc<dyn Notifier>,
    stats: Arc<RunStats>,
    recent_hours: i64,
    recent_window: Duration,
    concurrent: bool,
}

impl Aggregator {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn DocumentFetcher>,
        classifier: Arc<Classifier>,
        store: Arc<dyn SeenStore>,
        notifier: Arc<dyn Notifier>,
        stats: Arc<RunStats>,
    ) -> Self {
        let collectors = config
            .sources
            .iter()
            .cloned()
            .map(|desc| {
                Arc::new(Collector::new(
                    desc,
                    fetcher.clone(),
                    classifier.clone(),
                    config.fallback_offset,
                    stats.clone(),
                ))
            })
            .collect();

        Self {
            collectors,
            store,
            notifier,
            stats,
            recent_hours: config.recent_hours,
            recent_window: config.recent_window(),
            concurrent: config.concurrent_sources,
        }
    }

    pub async fn run(&self) -> RunReport {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> RunReport {
        // A window reaching past the representable past admits everything.
        let cutoff = now
            .checked_sub_signed(self.recent_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        info!(
            cutoff = %cutoff.to_rfc3339(),
            sources = self.collectors.len(),
            concurrent = self.concurrent,
            "Starting listing sweep"
        );

        let mut seen = self.store.load_or_empty().await;
        let candidates = self.gather().await;
        let fresh = select_fresh(candidates, cutoff, &mut seen, &self.stats);

        let delivery = if fresh.is_empty() {
            info!("No new listings in the last {} hours.", self.recent_hours);
            None
        } else {
            let blocks: Vec<String> = fresh.iter().map(notifier::format_block).collect();
            match self.notifier.notify(&blocks).await {
                Ok(status) => {
                    if matches!(status, DeliveryStatus::Sent { .. }) {
                        self.stats.record_notified(blocks.len());
                    }
                    Some(status)
                }
                Err(e) => {
                    error!(error = %e, blocks = blocks.len(), "Notification delivery failed");
                    None
                }
            }
        };

        if let Err(e) = self.store.persist(&seen).await {
            warn!(store = %self.store.describe(), error = %e, "Failed to persist seen-set");
        }

        RunReport { fresh, delivery }
    }

    /// Every collector's candidates, concatenated in source order.
    async fn gather(&self) -> Vec<Announcement> {
        let spawn = |c: &Arc<Collector>| {
            let c = Arc::clone(c);
            tokio::spawn(async move { c.collect().await })
        };

        let results = if self.concurrent {
            let handles: Vec<_> = self.collectors.iter().map(spawn).collect();
            join_all(handles).await
        } else {
            let mut results = Vec::with_capacity(self.collectors.len());
            for c in &self.collectors {
                results.push(spawn(c).await);
            }
            results
        };

        let mut all = Vec::new();
        for (collector, result) in self.collectors.iter().zip(results) {
            let exchange: Exchange = collector.descriptor().exchange;
            match result {
                Ok(Ok(items)) => {
                    info!(exchange = %exchange, items = items.len(), "Source collected");
                    all.extend(items);
                }
                Ok(Err(e)) => {
                    self.stats.record_source_failure();
                    warn!(exchange = %exchange, error = %e, "Source failed, contributing nothing");
                }
                Err(join_err) => {
                    self.stats.record_source_failure();
                    error!(exchange = %exchange, error = %join_err, "Source task died, contributing nothing");
                }
            }
        }
        all
    }
}

/// Recent, unseen announcements, newest first.
///
/// Keeps an item only when `published_at >= cutoff` and its fingerprint is not
/// in `seen`; a kept fingerprint is inserted immediately so the same URL from a
/// second source is dropped. Equal timestamps keep discovery order.
pub fn select_fresh(
    candidates: Vec<Announcement>,
    cutoff: DateTime<Utc>,
    seen: &mut SeenSet,
    stats: &RunStats,
) -> Vec<Announcement> {
    let mut fresh: Vec<Announcement> = Vec::new();

    for ann in candidates {
        let recent = ann.published_at.is_some_and(|ts| ts >= cutoff);
        if !recent {
            stats.record_stale();
            debug!(exchange = %ann.exchange, url = %ann.url, "Outside recency window");
            continue;
        }
        let fp = ann.fingerprint();
        if seen.contains(&fp) {
            stats.record_duplicate();
            debug!(exchange = %ann.exchange, url = %ann.url, "Already notified");
            continue;
        }
        seen.insert(fp);
        fresh.push(ann);
    }

    fresh.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    fresh
}
