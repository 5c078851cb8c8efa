// =============================================================================
// collector.rs — ONE ALGORITHM, FOUR EXCHANGES
// =============================================================================
//
// Given a SourceDescriptor, a collector:
//
//   1. fetches each index page (a failed page is logged and skipped)
//   2. picks out links whose href carries the source's path fragments
//   3. keeps only links whose text reads like a new listing, before any
//      detail page is fetched
//   4. drops repeat URLs and stops at the descriptor's cap
//   5. fetches each surviving detail page and resolves a publish time,
//      applying the source's policy when the page has none
//
// A collector holds no state once it returns. The only way it fails as a
// whole is when not a single index page could be loaded.
// =============================================================================

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use tracing::{debug, info, warn};
use url::Url;

use crate::classifier::Classifier;
use crate::error::CollectError;
use crate::fetcher::DocumentFetcher;
use crate::html;
use crate::metrics::RunStats;
use crate::models::{Announcement, DatePolicy, SourceDescriptor};
use crate::timestamp;

pub struct Collector {
    descriptor: SourceDescriptor,
    fetcher: Arc<dyn DocumentFetcher>,
    classifier: Arc<Classifier>,
    fallback_offset: FixedOffset,
    stats: Arc<RunStats>,
}

impl Collector {
    pub fn new(
        descriptor: SourceDescriptor,
        fetcher: Arc<dyn DocumentFetcher>,
        classifier: Arc<Classifier>,
        fallback_offset: FixedOffset,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            descriptor,
            fetcher,
            classifier,
            fallback_offset,
            stats,
        }
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    /// Collect with the descriptor's own cap.
    pub async fn collect(&self) -> Result<Vec<Announcement>, CollectError> {
        self.collect_at_most(self.descriptor.max_items).await
    }

    pub async fn collect_at_most(&self, max_items: usize) -> Result<Vec<Announcement>, CollectError> {
        let exchange = self.descriptor.exchange;
        let candidates = self.discover_candidates(max_items).await?;
        self.stats.record_candidates(candidates.len());

        info!(
            exchange = %exchange,
            candidates = candidates.len(),
            "{}: {} listing candidates, fetching detail pages",
            exchange,
            candidates.len()
        );

        let mut out = Vec::with_capacity(candidates.len());
        for mut ann in candidates {
            let detail = match self.fetcher.fetch(&ann.url).await {
                Ok(body) => {
                    self.stats.record_detail_page(true);
                    body
                }
                Err(e) => {
                    self.stats.record_detail_page(false);
                    warn!(
                        exchange = %exchange,
                        url = %ann.url,
                        error = %e,
                        timeout = e.is_timeout(),
                        "Detail page fetch failed, skipping item"
                    );
                    continue;
                }
            };

            match (timestamp::extract_timestamp(&detail, self.fallback_offset), self.descriptor.date_policy) {
                (Some(ts), _) => ann.published_at = Some(ts),
                (None, DatePolicy::Required) => {
                    self.stats.record_dropped_undated();
                    debug!(exchange = %exchange, url = %ann.url, "No publish date found, dropping");
                    continue;
                }
                (None, DatePolicy::FallbackToNow) => {
                    self.stats.record_stamped_now();
                    debug!(exchange = %exchange, url = %ann.url, "No publish date found, stamping with now");
                    ann.published_at = Some(Utc::now());
                }
            }
            out.push(ann);
        }

        Ok(out)
    }

    async fn discover_candidates(&self, max_items: usize) -> Result<Vec<Announcement>, CollectError> {
        let d = &self.descriptor;
        let mut candidates: Vec<Announcement> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut pages_loaded = 0usize;

        for index_url in &d.index_urls {
            if candidates.len() >= max_items {
                break;
            }

            let page = match self.fetcher.fetch(index_url).await {
                Ok(page) => {
                    self.stats.record_index_page(true);
                    pages_loaded += 1;
                    page
                }
                Err(e) => {
                    self.stats.record_index_page(false);
                    warn!(
                        exchange = %d.exchange,
                        url = %index_url,
                        error = %e,
                        timeout = e.is_timeout(),
                        "Index page fetch failed, skipping page"
                    );
                    continue;
                }
            };

            for anchor in html::anchors(&page) {
                if candidates.len() >= max_items {
                    break;
                }
                if !d.link_fragments.iter().all(|f| anchor.href.contains(f.as_str())) {
                    continue;
                }
                if !self.classifier.is_new_listing(Some(anchor.text.as_str())) {
                    continue;
                }
                let Some(url) = resolve_url(&d.origin, &anchor.href) else {
                    debug!(exchange = %d.exchange, href = %anchor.href, "Unresolvable link, skipping");
                    continue;
                };
                if !seen_urls.insert(url.clone()) {
                    continue;
                }
                debug!(
                    exchange = %d.exchange,
                    title = %anchor.text,
                    keyword = self.classifier.matched_keyword(Some(anchor.text.as_str())).unwrap_or_default(),
                    "Listing candidate"
                );
                candidates.push(Announcement::new(d.exchange, anchor.text, url));
            }
        }

        if pages_loaded == 0 && !d.index_urls.is_empty() {
            return Err(CollectError::NoIndexPages { exchange: d.exchange });
        }
        Ok(candidates)
    }
}

/// Absolute URL for an href found on a source page.
///
/// `//host/path` gets `https:`, `/path` gets the origin, anything that already
/// parses as a URL is kept as written, and a bare relative path is joined onto
/// the origin. Results that are not http(s) URLs with a host are rejected.
pub fn resolve_url(origin: &str, href: &str) -> Option<String> {
    let href = href.trim();
    let origin = origin.trim_end_matches('/');

    let resolved = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("{origin}{href}")
    } else if Url::parse(href).is_ok() {
        href.to_string()
    } else {
        format!("{origin}/{href}")
    };

    let parsed = Url::parse(&resolved).ok()?;
    let web = matches!(parsed.scheme(), "http" | "https");
    (web && parsed.host().is_some()).then_some(resolved)
}
