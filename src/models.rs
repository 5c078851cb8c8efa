// =============================================================================
// models.rs — THE NOUNS OF THE LISTING RADAR
// =============================================================================
//
// Exchanges, announcements, and the little per-source descriptors that tell
// the one generic collector how each help desk is wired. Every exchange runs
// its announcements on some flavour of ticketing software, and every one of
// them disagrees about where the publish date goes.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The exchanges we keep an eye on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Exchange {
    /// Zendesk-hosted help center with a dedicated New-Listing section.
    CoinEx,
    /// Custom support site. Links everywhere, dates sometimes.
    LBank,
    /// Zendesk again. Likes to title posts "Toobit lists XYZ".
    Toobit,
    /// Support categories with an "Initial Listing" habit.
    Kcex,
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::CoinEx => write!(f, "CoinEx"),
            Exchange::LBank => write!(f, "LBank"),
            Exchange::Toobit => write!(f, "Toobit"),
            Exchange::Kcex => write!(f, "KCEX"),
        }
    }
}

/// What to do when a detail page refuses to tell us when it was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePolicy {
    /// No date, no alert. The item is dropped.
    Required,
    /// Undated but still worth shouting about; stamp it with the current instant.
    FallbackToNow,
}

/// Everything the generic collector needs to know about one exchange.
/// Data, not behaviour: adding an exchange means adding one of these.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub exchange: Exchange,
    /// Listing index pages, fetched in order.
    pub index_urls: Vec<String>,
    /// Every fragment must appear in an href for the link to be a candidate.
    /// Empty means any link with an href qualifies.
    pub link_fragments: Vec<String>,
    /// Scheme + host used to resolve relative links, without a trailing slash.
    pub origin: String,
    /// Candidate cap across all index pages.
    pub max_items: usize,
    pub date_policy: DatePolicy,
}

/// A candidate new-listing event discovered on an exchange's site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub exchange: Exchange,
    /// Visible text of the announcement link.
    pub title: String,
    /// Absolute URL of the detail page. This is the identity key.
    pub url: String,
    /// UTC-normalized publication instant, once resolved.
    pub published_at: Option<DateTime<Utc>>,
}

impl Announcement {
    pub fn new(exchange: Exchange, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            exchange,
            title: title.into(),
            url: url.into(),
            published_at: None,
        }
    }

    /// Seen-set identity of this announcement.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.url)
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.published_at {
            Some(ts) => write!(f, "[{}] {} ({}) — {}", self.exchange, self.title, ts.to_rfc3339(), self.url),
            None => write!(f, "[{}] {} (undated) — {}", self.exchange, self.title, self.url),
        }
    }
}

/// Hex-encoded SHA-256 of a URL. Pure and stable across runs.
pub fn fingerprint(url: &str) -> String {
    use std::fmt::Write as _;

    let digest = Sha256::digest(url.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
