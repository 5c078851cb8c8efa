// =============================================================================
// timestamp.rs — WHEN WAS THIS POSTED, EXACTLY?
// =============================================================================
//
// Every exchange hides the publish date somewhere different. Some use a
// proper <time datetime="..."> element. Some put it in a meta tag. Some just
// print "2024-05-01 10:30" in the body and hope for the best. Some print
// nothing at all.
//
// So we try, in decreasing order of confidence:
//
//   1. <time datetime="...">          ISO-8601, a trailing Z means +00:00
//   2. meta tags, in fixed priority:  article:published_time, pubdate, date,
//                                     og:updated_time, lastmod
//   3. "YYYY-MM-DD HH:MM" in the text  read in the fallback timezone
//   4. "YYYY-MM-DD" in the text        midnight in the fallback timezone
//
// Each step is a small pure function returning Option. A malformed value in
// a higher step never aborts the cascade; it just hands over to the next one.
// =============================================================================

use std::cell::OnceCell;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tracing::debug;

use crate::html::{self, TagName};

static RE_TEXT_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(20\d{2}-\d{2}-\d{2})\s+(\d{2}:\d{2})").expect("datetime regex is valid")
});

static RE_TEXT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(20\d{2}-\d{2}-\d{2})").expect("date regex is valid"));

/// Meta tags consulted by step 2, highest priority first: (attribute, value).
const META_FIELDS: &[(&str, &str)] = &[
    ("property", "article:published_time"),
    ("name", "pubdate"),
    ("name", "date"),
    ("property", "og:updated_time"),
    ("name", "lastmod"),
];

/// A document under inspection. The rendered text is only computed if a
/// text-scanning step actually runs.
struct Page<'a> {
    html: &'a str,
    text: OnceCell<String>,
}

impl<'a> Page<'a> {
    fn new(html: &'a str) -> Self {
        Self {
            html,
            text: OnceCell::new(),
        }
    }

    fn text(&self) -> &str {
        self.text.get_or_init(|| html::visible_text(self.html))
    }
}

type Strategy = fn(&Page<'_>, FixedOffset) -> Option<DateTime<Utc>>;

const CASCADE: &[(&str, Strategy)] = &[
    ("time-element", from_time_element),
    ("meta-tag", from_meta_tags),
    ("text-datetime", from_text_datetime),
    ("text-date", from_text_date),
];

/// Best-effort publication instant of an HTML document, normalized to UTC.
/// `fallback` is the timezone assumed for dates printed as plain text.
pub fn extract_timestamp(html: &str, fallback: FixedOffset) -> Option<DateTime<Utc>> {
    let page = Page::new(html);
    CASCADE.iter().find_map(|(name, strategy)| {
        let found = strategy(&page, fallback);
        if let Some(ts) = found {
            debug!(strategy = *name, published_at = %ts.to_rfc3339(), "Publication timestamp resolved");
        }
        found
    })
}

fn from_time_element(page: &Page<'_>, _fallback: FixedOffset) -> Option<DateTime<Utc>> {
    if !has_time_tag(page.html) {
        return None;
    }

    // Only the first <time> that carries a datetime attribute is consulted.
    let tags = html::tags(page.html, TagName::Time);
    let value = tags.iter().find_map(|t| t.attr("datetime"))?;
    parse_iso8601(value)
}

/// Cheap scan for `<time` in any letter case before the regex pass.
fn has_time_tag(html: &str) -> bool {
    let bytes = html.as_bytes();
    memchr::memchr_iter(b'<', bytes).any(|i| {
        bytes
            .get(i..i + 5)
            .is_some_and(|w| w.eq_ignore_ascii_case(b"<time"))
    })
}

fn from_meta_tags(page: &Page<'_>, _fallback: FixedOffset) -> Option<DateTime<Utc>> {
    let metas = html::tags(page.html, TagName::Meta);
    if metas.is_empty() {
        return None;
    }

    META_FIELDS.iter().find_map(|(attr, wanted)| {
        let meta = metas
            .iter()
            .find(|m| m.attr(attr).is_some_and(|v| v.trim().eq_ignore_ascii_case(wanted)))?;
        let content = meta.attr("content")?.trim();
        if content.is_empty() {
            return None;
        }
        if content.chars().count() == 10 {
            parse_bare_date(content).map(|d| d.and_utc())
        } else {
            parse_iso8601(content)
        }
    })
}

fn from_text_datetime(page: &Page<'_>, fallback: FixedOffset) -> Option<DateTime<Utc>> {
    let cap = RE_TEXT_DATETIME.captures(page.text())?;
    let combined = format!("{} {}", &cap[1], &cap[2]);
    let naive = NaiveDateTime::parse_from_str(&combined, "%Y-%m-%d %H:%M").ok()?;
    in_timezone(naive, fallback)
}

fn from_text_date(page: &Page<'_>, fallback: FixedOffset) -> Option<DateTime<Utc>> {
    let cap = RE_TEXT_DATE.captures(page.text())?;
    let midnight = parse_bare_date(&cap[1])?;
    in_timezone(midnight, fallback)
}

fn in_timezone(naive: NaiveDateTime, tz: FixedOffset) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_bare_date(value: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// ISO-8601 in the shapes announcement pages actually use. A `Z` designator
/// is read as `+00:00`; values without any offset are taken as UTC.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim().replace('Z', "+00:00");
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&value, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&value, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    parse_bare_date(&value).map(|d| d.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn time_element_wins_over_conflicting_meta() {
        let html = r#"<html><head>
            <meta property="article:published_time" content="2020-01-01T00:00:00Z">
            </head><body><time datetime="2024-05-01T10:15:00Z">May 1</time></body></html>"#;
        assert_eq!(extract_timestamp(html, utc()), Some(at(2024, 5, 1, 10, 15, 0)));
    }

    #[test]
    fn time_element_offset_is_normalized_to_utc() {
        let html = r#"<time class="meta" datetime="2024-05-01T18:00:00+08:00">x</time>"#;
        assert_eq!(extract_timestamp(html, utc()), Some(at(2024, 5, 1, 10, 0, 0)));
    }

    #[test]
    fn mixed_case_time_element_still_wins_over_meta() {
        let html = r#"<meta name="date" content="2020-01-01T00:00:00Z">
            <Time datetime="2024-05-01T10:15:00Z">May 1</Time>"#;
        assert!(has_time_tag(html));
        assert_eq!(extract_timestamp(html, utc()), Some(at(2024, 5, 1, 10, 15, 0)));
    }

    #[test]
    fn time_without_datetime_attribute_is_ignored() {
        let html = r#"<time>yesterday</time><time datetime="2024-03-03T03:03:03Z"></time>"#;
        assert_eq!(extract_timestamp(html, utc()), Some(at(2024, 3, 3, 3, 3, 3)));
    }

    #[test]
    fn malformed_time_element_falls_through_to_meta() {
        let html = r#"<time datetime="last tuesday">x</time>
            <meta name="date" content="2024-02-02T12:00:00+00:00">"#;
        assert_eq!(extract_timestamp(html, utc()), Some(at(2024, 2, 2, 12, 0, 0)));
    }

    #[test]
    fn meta_fields_follow_priority_order_not_document_order() {
        let html = r#"
            <meta name="lastmod" content="2024-01-05T00:00:00Z">
            <meta name="pubdate" content="2024-01-03T00:00:00Z">
            <meta property="article:published_time" content="2024-01-01T08:30:00Z">"#;
        assert_eq!(extract_timestamp(html, utc()), Some(at(2024, 1, 1, 8, 30, 0)));
    }

    #[test]
    fn malformed_meta_moves_on_to_the_next_field() {
        let html = r#"
            <meta property="article:published_time" content="not a date at all">
            <meta property="og:updated_time" content="2024-04-04T04:04:00.123+00:00">"#;
        assert_eq!(
            extract_timestamp(html, utc()).map(|d| d.timestamp()),
            Some(at(2024, 4, 4, 4, 4, 0).timestamp())
        );
    }

    #[test]
    fn ten_character_meta_is_a_bare_date_at_midnight_utc() {
        let html = r#"<meta name="date" content=" 2024-06-30 ">"#;
        // Midnight UTC even when a non-UTC fallback is configured.
        let plus8 = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(extract_timestamp(html, plus8), Some(at(2024, 6, 30, 0, 0, 0)));
    }

    #[test]
    fn empty_meta_content_is_skipped() {
        let html = r#"<meta name="pubdate" content=""><meta name="lastmod" content="2024-07-07">"#;
        assert_eq!(extract_timestamp(html, utc()), Some(at(2024, 7, 7, 0, 0, 0)));
    }

    #[test]
    fn text_datetime_uses_the_fallback_timezone() {
        let html = "<article><p>Published: 2024-05-01 18:30</p><p>2023-01-01</p></article>";
        assert_eq!(extract_timestamp(html, utc()), Some(at(2024, 5, 1, 18, 30, 0)));

        let plus8 = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(extract_timestamp(html, plus8), Some(at(2024, 5, 1, 10, 30, 0)));
    }

    #[test]
    fn text_date_alone_is_midnight_in_the_fallback_timezone() {
        let html = "<div>Posted on 2024-08-15 by the team</div>";
        assert_eq!(extract_timestamp(html, utc()), Some(at(2024, 8, 15, 0, 0, 0)));

        let minus5 = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(extract_timestamp(html, minus5), Some(at(2024, 8, 15, 5, 0, 0)));
    }

    #[test]
    fn impossible_text_datetime_falls_through_to_the_next_date() {
        // 25:99 is not a time; the bare-date step picks up the first date instead.
        let html = "<p>2024-09-09 25:99</p>";
        assert_eq!(extract_timestamp(html, utc()), Some(at(2024, 9, 9, 0, 0, 0)));
    }

    #[test]
    fn dates_inside_scripts_are_not_text() {
        let html = "<script>var build = '2024-01-01 00:00';</script><p>No date here</p>";
        assert_eq!(extract_timestamp(html, utc()), None);
    }

    #[test]
    fn nothing_to_find_returns_none() {
        assert_eq!(extract_timestamp("<html><body>Hello</body></html>", utc()), None);
        assert_eq!(extract_timestamp("", utc()), None);
    }

    #[test]
    fn iso_parser_accepts_the_common_shapes() {
        assert_eq!(parse_iso8601("2024-05-01T10:00:00Z"), Some(at(2024, 5, 1, 10, 0, 0)));
        assert_eq!(parse_iso8601("2024-05-01T10:00:00+02:00"), Some(at(2024, 5, 1, 8, 0, 0)));
        assert_eq!(parse_iso8601("2024-05-01T10:00+0200"), Some(at(2024, 5, 1, 8, 0, 0)));
        assert_eq!(parse_iso8601("2024-05-01 10:00:00"), Some(at(2024, 5, 1, 10, 0, 0)));
        assert_eq!(parse_iso8601("2024-05-01"), Some(at(2024, 5, 1, 0, 0, 0)));
        assert_eq!(parse_iso8601("May 1st"), None);
        assert_eq!(parse_iso8601(""), None);
    }
}
