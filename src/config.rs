// =============================================================================
// config.rs — THE KNOBS
// =============================================================================
//
// Everything tunable lives in one `Config` value that is built once at
// startup and handed to each component. No globals, no runtime reloads.
//
// Every knob can be overridden through an environment variable prefixed with
// LISTING_RADAR_. The Telegram secrets keep their conventional unprefixed
// names because that is what every CI secret store already calls them.
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, TimeDelta, Utc};
use tracing::warn;

use crate::classifier::DEFAULT_KEYWORDS;
use crate::models::SourceDescriptor;
use crate::sources;

const DEFAULT_RECENT_HOURS: i64 = 6;

pub const DEFAULT_USER_AGENT: &str = "ListingRadar/1.1 (+https://github.com/listing-radar/listing-radar)";

#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // RECENCY
    // =========================================================================
    /// Trailing window, in hours, an announcement must fall into to be sent.
    /// Default: 6
    pub recent_hours: i64,

    // =========================================================================
    // HTTP
    // =========================================================================
    /// Bound on every single fetch. There are no retries, so this is also the
    /// longest a dead exchange can stall its collector per page.
    /// Default: 20 seconds
    pub request_timeout: Duration,

    /// Sent as the User-Agent on every fetch.
    pub user_agent: String,

    // =========================================================================
    // EXTRACTION
    // =========================================================================
    /// Case-insensitive substrings that mark a title as a new listing.
    pub keywords: Vec<String>,

    /// Timezone assumed for free-text dates found in page bodies.
    /// Default: UTC
    pub fallback_offset: FixedOffset,

    /// Per-exchange descriptors, processed in this order.
    pub sources: Vec<SourceDescriptor>,

    /// Run the collectors as concurrent tasks instead of one after another.
    pub concurrent_sources: bool,

    // =========================================================================
    // SEEN-SET PERSISTENCE
    // =========================================================================
    /// JSON file backing the seen-set. Default: seen.json
    pub seen_path: PathBuf,

    /// When set, the seen-set lives in Redis instead of `seen_path`.
    pub redis_url: Option<String>,

    /// Redis key holding the JSON array of fingerprints.
    pub redis_key: String,

    // =========================================================================
    // TELEGRAM
    // =========================================================================
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recent_hours: DEFAULT_RECENT_HOURS,
            request_timeout: Duration::from_secs(20),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            fallback_offset: utc_offset(),
            sources: sources::builtin(),
            concurrent_sources: true,
            seen_path: PathBuf::from("seen.json"),
            redis_url: None,
            redis_key: "listing_radar:seen".to_string(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the environment (and `.env`, if present),
    /// falling back to the defaults above for anything unset or unparsable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        let recent_hours = env::var("LISTING_RADAR_RECENT_HOURS")
            .or_else(|_| env::var("RECENT_HOURS"))
            .ok()
            .map_or(defaults.recent_hours, |raw| parse_recent_hours(&raw));

        let request_timeout = Duration::from_secs(
            env_or_default("LISTING_RADAR_REQUEST_TIMEOUT_SECS", "20")
                .parse()
                .unwrap_or(20),
        );

        let keywords = env::var("LISTING_RADAR_KEYWORDS")
            .ok()
            .map(|raw| parse_keywords(&raw))
            .filter(|k| !k.is_empty())
            .unwrap_or(defaults.keywords);

        let fallback_offset = env::var("LISTING_RADAR_FALLBACK_UTC_OFFSET_MINUTES")
            .ok()
            .map_or(defaults.fallback_offset, |raw| {
                parse_offset_minutes(&raw).unwrap_or_else(|| {
                    warn!(value = %raw, "Fallback UTC offset out of range, using UTC");
                    defaults.fallback_offset
                })
            });

        Config {
            recent_hours,
            request_timeout,
            user_agent: env_or_default("LISTING_RADAR_USER_AGENT", DEFAULT_USER_AGENT),
            keywords,
            fallback_offset,
            sources: defaults.sources,
            concurrent_sources: parse_bool(
                &env_or_default("LISTING_RADAR_CONCURRENT_SOURCES", "true"),
                true,
            ),
            seen_path: PathBuf::from(env_or_default("LISTING_RADAR_SEEN_PATH", "seen.json")),
            redis_url: env_non_empty("LISTING_RADAR_REDIS_URL"),
            redis_key: env_or_default("LISTING_RADAR_REDIS_KEY", "listing_radar:seen"),
            telegram_bot_token: env_non_empty("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: env_non_empty("TELEGRAM_CHAT_ID"),
            telegram_api_base: env_or_default("LISTING_RADAR_TELEGRAM_API_BASE", "https://api.telegram.org"),
        }
    }

    /// The recency window. Hour counts chrono cannot represent fall back to
    /// the default window.
    pub fn recent_window(&self) -> TimeDelta {
        TimeDelta::try_hours(self.recent_hours)
            .unwrap_or_else(|| TimeDelta::hours(DEFAULT_RECENT_HOURS))
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Comma-separated keyword list. Blank entries are dropped, case is kept
/// (matching is case-insensitive anyway).
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Recency window in hours. Negative, unparsable or unrepresentable values
/// are logged and replaced by the default.
fn parse_recent_hours(raw: &str) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(h) if h >= 0 && TimeDelta::try_hours(h).is_some() => h,
        _ => {
            warn!(value = %raw, default = DEFAULT_RECENT_HOURS, "Invalid recency window, using default");
            DEFAULT_RECENT_HOURS
        }
    }
}

/// Minutes east of UTC. `None` when unparsable or outside a day.
fn parse_offset_minutes(raw: &str) -> Option<FixedOffset> {
    let minutes: i32 = raw.trim().parse().ok()?;
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

/// `LISTING_RADAR_LOG_JSON`, read on its own because tracing is set up
/// before the rest of the configuration.
pub fn log_json_requested() -> bool {
    parse_bool(&env_or_default("LISTING_RADAR_LOG_JSON", "0"), false)
}

fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.recent_hours, 6);
        assert_eq!(cfg.request_timeout, Duration::from_secs(20));
        assert_eq!(cfg.fallback_offset.local_minus_utc(), 0);
        assert_eq!(cfg.sources.len(), 4);
        assert!(cfg.keywords.iter().any(|k| k == "will list"));
        assert!(cfg.telegram_bot_token.is_none());
        assert_eq!(cfg.recent_window(), chrono::Duration::hours(6));
    }

    #[test]
    fn keyword_list_is_trimmed_and_blank_entries_dropped() {
        let kws = parse_keywords(" will list , ,New Listing,");
        assert_eq!(kws, vec!["will list".to_string(), "New Listing".to_string()]);
        assert!(parse_keywords(" , ").is_empty());
    }

    #[test]
    fn recent_hours_outside_chrono_range_fall_back_to_default() {
        assert_eq!(parse_recent_hours("12"), 12);
        assert_eq!(parse_recent_hours(" 0 "), 0);
        assert_eq!(parse_recent_hours("10000000000000"), 6);
        assert_eq!(parse_recent_hours("9223372036854775807"), 6);
        assert_eq!(parse_recent_hours("-3"), 6);
        assert_eq!(parse_recent_hours("soon"), 6);
    }

    #[test]
    fn recent_window_never_panics_on_huge_hours() {
        let cfg = Config {
            recent_hours: i64::MAX,
            ..Config::default()
        };
        assert_eq!(cfg.recent_window(), TimeDelta::hours(6));
    }

    #[test]
    fn offset_minutes_reject_overflow_and_out_of_range() {
        assert_eq!(parse_offset_minutes("480").map(|o| o.local_minus_utc()), Some(8 * 3600));
        assert_eq!(parse_offset_minutes("-330").map(|o| o.local_minus_utc()), Some(-330 * 60));
        assert!(parse_offset_minutes("2147483647").is_none());
        assert!(parse_offset_minutes("100000").is_none());
        assert!(parse_offset_minutes("east").is_none());
    }

    #[test]
    fn bool_parsing_falls_back_to_default() {
        assert!(parse_bool("YES", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("maybe", true));
        assert!(!parse_bool("", false));
    }
}
