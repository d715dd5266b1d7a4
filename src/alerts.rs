//! Alert engine
//!
//! Scans rollups, graph edges and the league table against configurable
//! thresholds. Rules run in a fixed order and the combined list is cut to
//! [`MAX_ALERTS`] without re-sorting:
//!
//! 1. Redemption Watch: issuers with large face value due inside 12 months
//! 2. Market Pulse: tickers with heavy MARKET_ACTIVITY weight (top 3)
//! 3. Ratings Dispersion: issuers the agencies disagree on
//! 4. Headlines: heavy NEWS_CO_MENTION edges
//! 5. Bookrunner Dominance / Skew: concentration at the top of the league

use crate::debt::{rollup_as_of, DebtRollup};
use crate::format::{format_pct, format_usd};
use crate::graph::ConfigError;
use crate::league::league;
use crate::model::{Bond, Deal, Edge, Node, RatingRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub const MAX_ALERTS: usize = 10;
const MAX_PULSE_ALERTS: usize = 3;
const MARKET_ACTIVITY: &str = "MARKET_ACTIVITY";
const NEWS_CO_MENTION: &str = "NEWS_CO_MENTION";

/// Redemptions at or above this are always high severity
const HIGH_REDEMPTION_FLOOR_USD: f64 = 1_000_000_000.0;

/// Shortest allowed rescan interval
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Med,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "Redemption Watch")]
    RedemptionWatch,
    #[serde(rename = "Market Pulse")]
    MarketPulse,
    #[serde(rename = "Ratings Dispersion")]
    RatingsDispersion,
    #[serde(rename = "Headlines")]
    Headlines,
    #[serde(rename = "Bookrunner Dominance")]
    BookrunnerDominance,
    #[serde(rename = "Bookrunner Skew")]
    BookrunnerSkew,
}

impl AlertKind {
    pub fn title(self) -> &'static str {
        match self {
            AlertKind::RedemptionWatch => "Redemption Watch",
            AlertKind::MarketPulse => "Market Pulse",
            AlertKind::RatingsDispersion => "Ratings Dispersion",
            AlertKind::Headlines => "Headlines",
            AlertKind::BookrunnerDominance => "Bookrunner Dominance",
            AlertKind::BookrunnerSkew => "Bookrunner Skew",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Severity,
    pub entity: String,
    pub message: String,
}

impl Alert {
    fn new(kind: AlertKind, severity: Severity, entity: impl Into<String>, message: String) -> Self {
        Self {
            kind,
            severity,
            entity: entity.into(),
            message,
        }
    }
}

/// Alert thresholds. Any subset can be overridden from JSON; the rest keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Redemption window quoted in alert text
    #[serde(rename = "redeemNextMonths")]
    pub redeem_next_months: u32,
    #[serde(rename = "redeemMinUSD")]
    pub redeem_min_usd: f64,
    #[serde(rename = "pulseWeight")]
    pub pulse_weight: f64,
    #[serde(rename = "newsWeight")]
    pub news_weight: f64,
    #[serde(rename = "dispMin")]
    pub disp_min: f64,
    #[serde(rename = "bankSkew")]
    pub bank_skew: f64,
    #[serde(rename = "bankDom")]
    pub bank_dom: f64,
    #[serde(rename = "scanIntervalSec")]
    pub scan_interval_sec: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            redeem_next_months: 12,
            redeem_min_usd: 250_000_000.0,
            pulse_weight: 3.0,
            news_weight: 1.5,
            disp_min: 2.0,
            bank_skew: 0.33,
            bank_dom: 0.5,
            scan_interval_sec: 10.0,
        }
    }
}

impl AlertConfig {
    /// Parse a JSON object of overrides; arrays and scalars are rejected
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str(json)? {
            value @ Value::Object(_) => Ok(serde_json::from_value(value)?),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    /// Rescan interval, never below [`MIN_SCAN_INTERVAL`]
    pub fn scan_interval(&self) -> Duration {
        if !self.scan_interval_sec.is_finite() {
            return MIN_SCAN_INTERVAL;
        }
        Duration::try_from_secs_f64(self.scan_interval_sec.max(0.0))
            .unwrap_or(Duration::MAX)
            .max(MIN_SCAN_INTERVAL)
    }
}

/// Everything one scan reads
#[derive(Debug, Clone, Copy)]
pub struct ScanInput<'a> {
    pub nodes: &'a [Node],
    pub edges: &'a [Edge],
    pub bonds: &'a [Bond],
    pub ratings: &'a [RatingRecord],
    pub deals: &'a [Deal],
}

/// Run every rule as of the current instant
pub fn scan(input: &ScanInput<'_>, config: &AlertConfig) -> Vec<Alert> {
    scan_as_of(input, config, Utc::now())
}

pub fn scan_as_of(input: &ScanInput<'_>, config: &AlertConfig, now: DateTime<Utc>) -> Vec<Alert> {
    let rollups = rollup_as_of(input.bonds, input.ratings, now);

    let mut alerts = Vec::new();
    alerts.extend(redemption_watch(&rollups, config));
    alerts.extend(market_pulse(input.edges, config));
    alerts.extend(ratings_dispersion(&rollups, config));
    alerts.extend(headlines(input.edges, config));
    alerts.extend(bookrunner_concentration(input.deals, config));

    log::debug!(
        "Alert scan produced {} alerts (keeping {})",
        alerts.len(),
        alerts.len().min(MAX_ALERTS)
    );
    alerts.truncate(MAX_ALERTS);
    alerts
}

fn redemption_watch(rollups: &[DebtRollup], config: &AlertConfig) -> Vec<Alert> {
    let high_floor = HIGH_REDEMPTION_FLOOR_USD.max(config.redeem_min_usd * 2.0);
    rollups
        .iter()
        .filter(|r| r.next_12m >= config.redeem_min_usd)
        .map(|r| {
            let severity = if r.next_12m >= high_floor {
                Severity::High
            } else {
                Severity::Med
            };
            Alert::new(
                AlertKind::RedemptionWatch,
                severity,
                r.issuer.clone(),
                format!(
                    "{}: {} due in {}m",
                    r.issuer,
                    format_usd(r.next_12m),
                    config.redeem_next_months
                ),
            )
        })
        .collect()
}

/// Ticker segment of a namespaced id (`COMP:AAPL` -> `AAPL`)
fn ticker_segment(id: &str) -> Option<&str> {
    id.split(':').nth(1).filter(|t| !t.is_empty())
}

#[derive(Default)]
struct Activity {
    count: u32,
    weight: f64,
}

fn market_pulse(edges: &[Edge], config: &AlertConfig) -> Vec<Alert> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_ticker: HashMap<&str, Activity> = HashMap::new();

    for edge in edges.iter().filter(|e| e.tag_contains(MARKET_ACTIVITY)) {
        for ticker in [&edge.source, &edge.target]
            .into_iter()
            .filter_map(|id| ticker_segment(id))
        {
            let stat = by_ticker.entry(ticker).or_insert_with(|| {
                order.push(ticker);
                Activity::default()
            });
            stat.count += 1;
            stat.weight += edge.weight;
        }
    }

    let mut hot: Vec<(&str, &Activity)> = order
        .into_iter()
        .map(|t| (t, &by_ticker[t]))
        .filter(|(_, stat)| stat.weight >= config.pulse_weight)
        .collect();
    hot.sort_by(|a, b| b.1.weight.total_cmp(&a.1.weight));

    hot.into_iter()
        .take(MAX_PULSE_ALERTS)
        .map(|(ticker, stat)| {
            let severity = if stat.weight >= config.pulse_weight * 1.5 {
                Severity::High
            } else {
                Severity::Med
            };
            log::trace!("Pulse {}: {} edges, weight {:.2}", ticker, stat.count, stat.weight);
            Alert::new(
                AlertKind::MarketPulse,
                severity,
                ticker,
                format!("{}: activity up", ticker),
            )
        })
        .collect()
}

fn ratings_dispersion(rollups: &[DebtRollup], config: &AlertConfig) -> Vec<Alert> {
    rollups
        .iter()
        .filter_map(|r| {
            let disp = f64::from(r.dispersion.unwrap_or(0));
            if disp < config.disp_min {
                return None;
            }
            let severity = if disp >= config.disp_min + 1.0 {
                Severity::High
            } else {
                Severity::Med
            };
            Some(Alert::new(
                AlertKind::RatingsDispersion,
                severity,
                r.issuer.clone(),
                "Agency disagreement".to_string(),
            ))
        })
        .collect()
}

fn headlines(edges: &[Edge], config: &AlertConfig) -> Vec<Alert> {
    edges
        .iter()
        .filter(|e| e.tag_contains(NEWS_CO_MENTION) && e.weight >= config.news_weight)
        .map(|e| {
            Alert::new(
                AlertKind::Headlines,
                Severity::Low,
                format!("{}↔{}", e.source, e.target),
                "Co-mention".to_string(),
            )
        })
        .collect()
}

fn bookrunner_concentration(deals: &[Deal], config: &AlertConfig) -> Option<Alert> {
    let rows = league(deals);
    if rows.is_empty() {
        return None;
    }
    let sum: f64 = rows.iter().map(|r| r.total).sum();
    let total = if sum == 0.0 { 1.0 } else { sum };
    // First row with the largest total; ties go to the earlier bank
    let top = rows
        .into_iter()
        .reduce(|best, row| if row.total > best.total { row } else { best })?;
    let share = top.total / total;

    if share >= config.bank_dom {
        Some(Alert::new(
            AlertKind::BookrunnerDominance,
            Severity::High,
            top.bank,
            format!("Share {}%", format_pct(share)),
        ))
    } else if share >= config.bank_skew {
        Some(Alert::new(
            AlertKind::BookrunnerSkew,
            Severity::Med,
            top.bank,
            format!("Leads {}%", format_pct(share)),
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as Days, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn bond(issuer: &str, face: f64, days_out: i64) -> Bond {
        Bond {
            id: format!("{}-{}", issuer, days_out),
            issuer_ticker: issuer.to_string(),
            label: String::new(),
            face_value: face,
            coupon: 0.0,
            issue_date: None,
            maturity_date: (now() + Days::days(days_out)).date_naive(),
            rating: None,
        }
    }

    fn run(
        edges: &[Edge],
        bonds: &[Bond],
        ratings: &[RatingRecord],
        deals: &[Deal],
        config: &AlertConfig,
    ) -> Vec<Alert> {
        let input = ScanInput {
            nodes: &[],
            edges,
            bonds,
            ratings,
            deals,
        };
        scan_as_of(&input, config, now())
    }

    #[test]
    fn test_redemption_watch_med() {
        let alerts = run(&[], &[bond("ACME", 300e6, 100)], &[], &[], &AlertConfig::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::RedemptionWatch);
        assert_eq!(alerts[0].severity, Severity::Med);
        assert_eq!(alerts[0].entity, "ACME");
        assert_eq!(alerts[0].message, "ACME: $300,000,000 due in 12m");
    }

    #[test]
    fn test_redemption_watch_high_and_below_floor() {
        let bonds = vec![bond("BIG", 1.2e9, 30), bond("SMALL", 100e6, 30), bond("LATER", 5e9, 900)];
        let alerts = run(&[], &bonds, &[], &[], &AlertConfig::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].entity, "BIG");
        assert_eq!(alerts[0].severity, Severity::High);
    }

    #[test]
    fn test_market_pulse_top_three() {
        let edges = vec![
            Edge::new("COMP:A", "COMP:B", "MARKET_ACTIVITY", 2.0),
            Edge::new("COMP:A", "COMP:C", "MARKET_ACTIVITY", 2.5),
            Edge::new("COMP:B", "COMP:C", "MARKET_ACTIVITY", 1.5),
            Edge::new("COMP:D", "COMP:A", "MARKET_ACTIVITY", 0.5),
            Edge::new("COMP:D", "COMP:E", "SUPPLIER", 50.0),
        ];
        let alerts = run(&edges, &[], &[], &[], &AlertConfig::default());
        // A=5.0, C=4.0, B=3.5, D=0.5
        let tickers: Vec<_> = alerts.iter().map(|a| a.entity.as_str()).collect();
        assert_eq!(tickers, vec!["A", "C", "B"]);
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[1].severity, Severity::Med);
        assert_eq!(alerts[0].message, "A: activity up");
    }

    #[test]
    fn test_pulse_ignores_ids_without_namespace() {
        let edges = vec![Edge::new("AAPL", "COMP:MSFT", "MARKET_ACTIVITY", 4.0)];
        let alerts = run(&edges, &[], &[], &[], &AlertConfig::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].entity, "MSFT");
    }

    #[test]
    fn test_ratings_dispersion() {
        let bonds = vec![bond("WIDE", 1.0, 900), bond("NARROW", 1.0, 900), bond("SPLIT", 1.0, 900)];
        let ratings = vec![
            RatingRecord {
                issuer_ticker: "WIDE".into(),
                moodys: Some("Aa1".into()),
                sp: Some("A".into()),
                fitch: None,
            },
            RatingRecord {
                issuer_ticker: "NARROW".into(),
                moodys: Some("Aa2".into()),
                sp: Some("AA".into()),
                fitch: Some("AA-".into()),
            },
            RatingRecord {
                issuer_ticker: "SPLIT".into(),
                moodys: None,
                sp: Some("BBB".into()),
                fitch: Some("BBB-".into()),
            },
        ];
        let config = AlertConfig {
            disp_min: 1.0,
            ..Default::default()
        };
        let alerts = run(&[], &bonds, &ratings, &[], &config);
        // WIDE: 2 vs 6 -> 4, NARROW: 1, SPLIT: 1
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].entity, "WIDE");
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[1].severity, Severity::Med);
        assert!(alerts.iter().all(|a| a.kind == AlertKind::RatingsDispersion));
    }

    #[test]
    fn test_headlines() {
        let edges = vec![
            Edge::new("COMP:AAPL", "COMP:AMZN", "NEWS_CO_MENTION", 1.5),
            Edge::new("COMP:AAPL", "COMP:MSFT", "NEWS_CO_MENTION", 1.4),
        ];
        let alerts = run(&edges, &[], &[], &[], &AlertConfig::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].entity, "COMP:AAPL↔COMP:AMZN");
        assert_eq!(alerts[0].severity, Severity::Low);
    }

    #[test]
    fn test_bookrunner_dominance_and_skew() {
        let dominant = vec![Deal::new("A", "B", 600.0, "X"), Deal::new("A", "B", 400.0, "Y")];
        let alerts = run(&[], &[], &[], &dominant, &AlertConfig::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::BookrunnerDominance);
        assert_eq!(alerts[0].entity, "X");
        assert_eq!(alerts[0].message, "Share 60.0%");

        let skewed = vec![
            Deal::new("A", "B", 400.0, "X"),
            Deal::new("A", "B", 300.0, "Y"),
            Deal::new("A", "B", 300.0, "Z"),
        ];
        let alerts = run(&[], &[], &[], &skewed, &AlertConfig::default());
        assert_eq!(alerts[0].kind, AlertKind::BookrunnerSkew);
        assert_eq!(alerts[0].severity, Severity::Med);
        assert_eq!(alerts[0].message, "Leads 40.0%");

        let even: Vec<Deal> = ["P", "Q", "R", "S"]
            .iter()
            .map(|b| Deal::new("A", "B", 100.0, b))
            .collect();
        assert!(run(&[], &[], &[], &even, &AlertConfig::default()).is_empty());
    }

    #[test]
    fn test_bookrunner_tie_names_first_bank() {
        let deals = vec![
            Deal::new("A", "B", 100.0, "X"),
            Deal::new("A", "B", 60.0, "Y"),
            Deal::new("A", "B", 40.0, "Y"),
            Deal::new("A", "B", 100.0, "Z"),
        ];
        let alerts = run(&[], &[], &[], &deals, &AlertConfig::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::BookrunnerSkew);
        assert_eq!(alerts[0].entity, "X");
        assert_eq!(alerts[0].message, "Leads 33.3%");
    }

    #[test]
    fn test_capped_at_ten_in_rule_order() {
        let bonds: Vec<Bond> = (0..12).map(|i| bond(&format!("I{:02}", i), 300e6, 30)).collect();
        let deals = vec![Deal::new("A", "B", 1.0, "X")];
        let alerts = run(&[], &bonds, &[], &deals, &AlertConfig::default());
        assert_eq!(alerts.len(), MAX_ALERTS);
        assert!(alerts.iter().all(|a| a.kind == AlertKind::RedemptionWatch));
        assert_eq!(alerts[0].entity, "I00");
    }

    #[test]
    fn test_config_partial_override() {
        let c = AlertConfig::from_json(r#"{"redeemMinUSD": 1e8, "bankDom": 0.7}"#).unwrap();
        assert_eq!(c.redeem_min_usd, 1e8);
        assert_eq!(c.bank_dom, 0.7);
        assert_eq!(c.pulse_weight, 3.0);
        assert_eq!(c.bank_skew, 0.33);
        assert!(matches!(
            AlertConfig::from_json("[1]"),
            Err(ConfigError::NotAnObject)
        ));
        assert!(AlertConfig::from_json("3").is_err());
        assert!(AlertConfig::from_json("{").is_err());
    }

    #[test]
    fn test_scan_interval_floor() {
        let mut c = AlertConfig::default();
        assert_eq!(c.scan_interval(), std::time::Duration::from_secs(10));
        c.scan_interval_sec = 1.0;
        assert_eq!(c.scan_interval(), MIN_SCAN_INTERVAL);
        c.scan_interval_sec = f64::NAN;
        assert_eq!(c.scan_interval(), MIN_SCAN_INTERVAL);
        c.scan_interval_sec = -5.0;
        assert_eq!(c.scan_interval(), MIN_SCAN_INTERVAL);
    }

    #[test]
    fn test_huge_scan_interval_saturates() {
        let c = AlertConfig::from_json(r#"{"scanIntervalSec": 1e30}"#).unwrap();
        assert_eq!(c.scan_interval(), std::time::Duration::MAX);
    }

    #[test]
    fn test_alert_json_shape() {
        let alert = Alert::new(AlertKind::MarketPulse, Severity::Med, "AAPL", "x".into());
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "Market Pulse");
        assert_eq!(json["severity"], "med");
    }
}
