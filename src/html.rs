// =============================================================================
// html.rs — JUST ENOUGH HTML
// =============================================================================
//
// We need three things out of an announcement page: the attributes of a few
// specific tags, the links, and the text a human would read. That is a small
// enough ask that a handful of regexes does the job, and markup that breaks
// them simply yields nothing, which the callers already treat as "try the
// next heuristic".
// =============================================================================

use std::sync::LazyLock;

use regex::Regex;

static RE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("attribute regex is valid")
});

static RE_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").expect("anchor regex is valid")
});

static RE_INVISIBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>")
        .expect("invisible-block regex is valid")
});

static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"));

static RE_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

static RE_TIME_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<time\b([^>]*)>").expect("time tag regex is valid"));

static RE_META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b([^>]*)>").expect("meta tag regex is valid"));

/// Elements whose opening tags the date cascade reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagName {
    Time,
    Meta,
}

impl TagName {
    fn pattern(self) -> &'static Regex {
        match self {
            TagName::Time => &*RE_TIME_TAG,
            TagName::Meta => &*RE_META_TAG,
        }
    }
}

/// The opening tag of an element, reduced to its attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    attrs: Vec<(String, String)>,
}

impl Tag {
    fn parse(raw_attrs: &str) -> Self {
        let attrs = RE_ATTR
            .captures_iter(raw_attrs)
            .map(|cap| {
                let name = cap[1].to_ascii_lowercase();
                let value = cap
                    .get(2)
                    .or_else(|| cap.get(3))
                    .or_else(|| cap.get(4))
                    .map(|m| html_escape::decode_html_entities(m.as_str()).into_owned())
                    .unwrap_or_default();
                (name, value)
            })
            .collect();
        Self { attrs }
    }

    /// Attribute value by (case-insensitive) name, entities decoded.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Every opening `<name ...>` tag in document order.
pub fn tags(html: &str, name: TagName) -> Vec<Tag> {
    name.pattern()
        .captures_iter(html)
        .map(|cap| Tag::parse(&cap[1]))
        .collect()
}

/// A link found in a page: raw href (entities decoded) and its visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// All `<a href=...>` elements in document order. Anchors without an href are skipped.
pub fn anchors(html: &str) -> Vec<Anchor> {
    RE_ANCHOR
        .captures_iter(html)
        .filter_map(|cap| {
            let tag = Tag::parse(&cap[1]);
            let href = tag.attr("href")?.trim().to_string();
            if href.is_empty() {
                return None;
            }
            Some(Anchor {
                href,
                text: visible_text(&cap[2]),
            })
        })
        .collect()
}

/// The text a reader would see: scripts, styles and comments removed, tags
/// turned into spaces, entities decoded, whitespace collapsed and trimmed.
pub fn visible_text(html: &str) -> String {
    let without_blocks = RE_INVISIBLE.replace_all(html, " ");
    let without_tags = RE_TAG.replace_all(&without_blocks, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}
