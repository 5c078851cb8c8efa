// =============================================================================
// sources.rs — THE FOUR HELP DESKS
// =============================================================================
//
// Where each exchange posts its listings, which links on those pages are
// announcements, and how much we trust its date markup. CoinEx and LBank
// reliably date their posts, so an undated page there is skipped. Toobit and
// KCEX often don't, so an undated page there is stamped "now" rather than lost.
// =============================================================================

use crate::models::{DatePolicy, Exchange, SourceDescriptor};

/// The built-in sources, in the order they are processed.
pub fn builtin() -> Vec<SourceDescriptor> {
    vec![coinex(), lbank(), toobit(), kcex()]
}

fn coinex() -> SourceDescriptor {
    SourceDescriptor {
        exchange: Exchange::CoinEx,
        index_urls: vec![
            "https://coinex-announcement.zendesk.com/hc/en-us/sections/360003716631-New-Listing".into(),
        ],
        link_fragments: vec!["/hc/".into(), "/articles/".into()],
        origin: "https://coinex-announcement.zendesk.com".into(),
        max_items: 15,
        date_policy: DatePolicy::Required,
    }
}

fn lbank() -> SourceDescriptor {
    SourceDescriptor {
        exchange: Exchange::LBank,
        index_urls: vec![
            "https://www.lbank.com/support/announcement".into(),
            // New Listing section
            "https://www.lbank.com/support/sections/CO00000044".into(),
        ],
        link_fragments: vec!["/support/".into()],
        origin: "https://www.lbank.com".into(),
        max_items: 20,
        date_policy: DatePolicy::Required,
    }
}

fn toobit() -> SourceDescriptor {
    SourceDescriptor {
        exchange: Exchange::Toobit,
        index_urls: vec![
            "https://support.toobit.com/hc/en-us/sections/13177993830553-New-Listings".into(),
            "https://support.toobit.com/hc/en-us/categories/13177471185817-Announcements".into(),
        ],
        // Any link: Toobit mixes announcement links into generic navigation.
        link_fragments: vec![],
        origin: "https://support.toobit.com".into(),
        max_items: 30,
        date_policy: DatePolicy::FallbackToNow,
    }
}

fn kcex() -> SourceDescriptor {
    SourceDescriptor {
        exchange: Exchange::Kcex,
        index_urls: vec![
            // Listing Information
            "https://www.kcex.com/support/categories/25313105314073".into(),
            // Latest Announcements
            "https://www.kcex.com/support/categories/25312191952921".into(),
        ],
        link_fragments: vec!["/support/articles/".into()],
        origin: "https://www.kcex.com".into(),
        max_items: 30,
        date_policy: DatePolicy::FallbackToNow,
    }
}
