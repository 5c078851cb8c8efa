// =============================================================================
// error.rs — EVERYTHING THAT CAN GO WRONG, WITH A NAME
// =============================================================================
//
// None of these ever take the process down. Each one has a place where it is
// caught and turned into "fewer alerts this run" plus a warn! line.
// =============================================================================

use thiserror::Error;

use crate::models::Exchange;

/// A single page fetch failed. Caught by the collector; the page or item is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("reading body of {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Request { source, .. } | FetchError::Body { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

/// A whole source produced nothing usable. Caught by the aggregator.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{exchange}: none of its index pages could be fetched")]
    NoIndexPages { exchange: Exchange },
}

/// The seen-set backend misbehaved. Load degrades to empty, persist is logged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("seen-store I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("seen-store contents are not a JSON string array: {0}")]
    Json(#[from] serde_json::Error),

    #[error("seen-store redis: {0}")]
    Redis(#[from] redis::RedisError),
}

/// The notifier could not deliver.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifier credentials missing ({0})")]
    MissingCredentials(&'static str),

    #[error("notifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notifier rejected the message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}
