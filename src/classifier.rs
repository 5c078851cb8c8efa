// =============================================================================
// classifier.rs — "IS THIS A NEW LISTING?"
// =============================================================================
//
// A title is a new listing if it contains any of a handful of keywords,
// ignoring case. That's it. The whole precision/recall tradeoff lives in the
// keyword list, which is why the list comes from `Config` and not from here.
//
// Matching runs an Aho-Corasick automaton over the lowercased title, so every
// keyword is checked in a single pass no matter how long the list grows.
//
// Known wart: "lists" is a bare substring, so "XYZ delists ABC" also counts.
// Toobit titles its posts "Toobit lists <TOKEN>", and a false positive here
// costs one extra alert, while a false negative costs a missed listing.
// =============================================================================

use aho_corasick::{AhoCorasick, BuildError};
use tracing::debug;

/// The keyword set the radar ships with.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "will list",
    "will be listed",
    "new listing",
    "lists",              // Toobit: "Toobit lists <TOKEN> ..."
    "initial listing",    // KCEX
    "perpetual contract", // futures listings
];

pub struct Classifier {
    automaton: AhoCorasick,
    keywords: Vec<String>,
}

impl Classifier {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Result<Self, BuildError> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&keywords)?;

        debug!(keywords = ?keywords, "Listing classifier built");
        Ok(Self { automaton, keywords })
    }

    /// True when the title contains any configured keyword. A missing or
    /// blank title is never a listing.
    pub fn is_new_listing(&self, title: Option<&str>) -> bool {
        self.matched_keyword(title).is_some()
    }

    /// The first keyword found in the title, for logging.
    pub fn matched_keyword(&self, title: Option<&str>) -> Option<&str> {
        let title = title.map(str::trim).filter(|t| !t.is_empty())?;
        let lowered = title.to_lowercase();
        self.automaton
            .find(&lowered)
            .map(|m| self.keywords[m.pattern().as_usize()].as_str())
    }
}
