//! News-style pulse feed built from deals, co-mentions, redemptions and
//! ratings disagreement, plus any caller-supplied headlines.

use crate::alerts::Severity;
use crate::debt::rollup_as_of;
use crate::format::format_usd;
use crate::model::{Bond, Deal, Edge, RatingRecord};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_FEED_ITEMS: usize = 20;
const NEWS_CO_MENTION: &str = "NEWS_CO_MENTION";
const HIGH_REDEMPTION_USD: f64 = 1_000_000_000.0;
const DISPERSION_FLAG: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedKind {
    Deal,
    Headlines,
    Redemption,
    Ratings,
    News,
}

/// Externally sourced headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tone: Option<Severity>,
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub ts: DateTime<Utc>,
    pub tone: Severity,
    pub kind: FeedKind,
    pub text: String,
    pub url: Option<String>,
    pub summary: Option<String>,
}

impl FeedItem {
    fn new(ts: DateTime<Utc>, tone: Severity, kind: FeedKind, text: String) -> Self {
        Self {
            ts,
            tone,
            kind,
            text,
            url: None,
            summary: None,
        }
    }
}

/// Ticker part of a namespaced id, or the whole id when it has no namespace
fn display_ticker(id: &str) -> &str {
    id.split(':').nth(1).unwrap_or(id)
}

/// Everything the feed reads
#[derive(Debug, Clone, Copy)]
pub struct FeedInput<'a> {
    pub edges: &'a [Edge],
    pub bonds: &'a [Bond],
    pub ratings: &'a [RatingRecord],
    pub deals: &'a [Deal],
    pub news: &'a [NewsItem],
}

/// Build the feed, newest first, capped at [`MAX_FEED_ITEMS`]
pub fn feed(input: &FeedInput<'_>, now: DateTime<Utc>) -> Vec<FeedItem> {
    let mut items = Vec::new();

    for d in input.deals {
        let ts = d
            .announced_date
            .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
            .unwrap_or(now);
        let mut text = format!(
            "Deal: {} ↔ {}",
            display_ticker(&d.company_a),
            display_ticker(&d.company_b)
        );
        if let Some(t) = d.deal_type.as_deref().filter(|t| !t.is_empty()) {
            text.push_str(&format!(" ({})", t.replace('_', " ")));
        }
        if d.value_usd > 0.0 {
            text.push_str(&format!(" · {}", format_usd(d.value_usd)));
        }
        items.push(FeedItem::new(ts, Severity::Low, FeedKind::Deal, text));
    }

    for e in input.edges.iter().filter(|e| e.tag_contains(NEWS_CO_MENTION)) {
        items.push(FeedItem::new(
            now,
            Severity::Low,
            FeedKind::Headlines,
            format!(
                "Headlines: {} ↔ {}",
                display_ticker(&e.source),
                display_ticker(&e.target)
            ),
        ));
    }

    let rollups = rollup_as_of(input.bonds, input.ratings, now);
    for r in rollups.iter().filter(|r| r.next_12m > 0.0) {
        let tone = if r.next_12m >= HIGH_REDEMPTION_USD {
            Severity::High
        } else {
            Severity::Med
        };
        items.push(FeedItem::new(
            now,
            tone,
            FeedKind::Redemption,
            format!(
                "Redemption: {} {} in next 12m",
                r.issuer,
                format_usd(r.next_12m)
            ),
        ));
    }
    for r in rollups
        .iter()
        .filter(|r| r.dispersion.unwrap_or(0) >= DISPERSION_FLAG)
    {
        items.push(FeedItem::new(
            now,
            Severity::Med,
            FeedKind::Ratings,
            format!("Ratings dispersion: {}", r.issuer),
        ));
    }

    for n in input.news {
        let mut item = FeedItem::new(
            n.ts.unwrap_or(now),
            n.tone.unwrap_or(Severity::Low),
            FeedKind::News,
            n.title.clone(),
        );
        item.url = n.url.clone();
        item.summary = n.summary.clone();
        items.push(item);
    }

    items.sort_by(|a, b| b.ts.cmp(&a.ts));
    items.truncate(MAX_FEED_ITEMS);
    items
}
