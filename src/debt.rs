//! Debt rollup calculator
//!
//! Aggregates bonds per issuer (outstanding face, weighted-average maturity,
//! redemptions inside twelve months) and joins the issuer's agency ratings.

use crate::model::{Bond, RatingRecord};
use crate::ratings::{normalize, UnifiedMark};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rendered in place of a missing rating, never a grade
pub const UNAVAILABLE: &str = "—";

const DAYS_PER_YEAR: f64 = 365.25;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Slack on the one-year redemption window to absorb float error
const NEXT_12M_HORIZON_YEARS: f64 = 1.0001;

/// Per-issuer summary of debt outstanding and agency ratings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtRollup {
    pub issuer: String,
    pub moodys: Option<String>,
    pub sp: Option<String>,
    pub fitch: Option<String>,
    pub moodys_u: Option<UnifiedMark>,
    pub sp_u: Option<UnifiedMark>,
    pub fitch_u: Option<UnifiedMark>,
    /// Mean ladder score of the available agencies (lower is stronger)
    pub avg_score: Option<f64>,
    /// Spread between best and worst agency score
    pub dispersion: Option<u8>,
    pub total_face: f64,
    pub wam_years: f64,
    pub next_12m: f64,
}

impl DebtRollup {
    pub fn display_moodys(&self) -> String {
        display_pair(&self.moodys, self.moodys_u)
    }

    pub fn display_sp(&self) -> String {
        display_pair(&self.sp, self.sp_u)
    }

    pub fn display_fitch(&self) -> String {
        display_pair(&self.fitch, self.fitch_u)
    }
}

fn display_pair(raw: &Option<String>, unified: Option<UnifiedMark>) -> String {
    let raw = raw.as_deref().unwrap_or(UNAVAILABLE);
    let unified = unified.map(UnifiedMark::as_str).unwrap_or(UNAVAILABLE);
    format!("{} [{}]", raw, unified)
}

/// Fractional years from `from` to `to` on a 365.25-day year. Negative when
/// `to` is in the past.
pub fn years_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let secs = (to - from).num_milliseconds() as f64 / 1000.0;
    secs / (DAYS_PER_YEAR * SECONDS_PER_DAY)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

#[derive(Default)]
struct Accumulator {
    total: f64,
    weighted_years: f64,
    next_12m: f64,
}

/// Roll bonds up by issuer as of the current instant
pub fn rollup(bonds: &[Bond], ratings: &[RatingRecord]) -> Vec<DebtRollup> {
    rollup_as_of(bonds, ratings, Utc::now())
}

/// Roll bonds up by issuer as of `now`. One row per distinct issuer, in the
/// order issuers first appear in `bonds`.
pub fn rollup_as_of(
    bonds: &[Bond],
    ratings: &[RatingRecord],
    now: DateTime<Utc>,
) -> Vec<DebtRollup> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_issuer: HashMap<&str, Accumulator> = HashMap::new();

    for bond in bonds {
        let issuer = bond.issuer_ticker.as_str();
        if issuer.is_empty() {
            continue;
        }
        let acc = by_issuer.entry(issuer).or_insert_with(|| {
            order.push(issuer);
            Accumulator::default()
        });

        let face = bond.face_value;
        let years = years_between(now, start_of_day(bond.maturity_date));
        acc.total += face;
        acc.weighted_years += face * years.max(0.0);
        if years <= NEXT_12M_HORIZON_YEARS {
            acc.next_12m += face;
        }
    }

    order
        .into_iter()
        .map(|issuer| {
            let acc = &by_issuer[issuer];
            let record = ratings.iter().find(|r| r.issuer_ticker == issuer);
            summarize(issuer, acc, record)
        })
        .collect()
}

fn summarize(issuer: &str, acc: &Accumulator, record: Option<&RatingRecord>) -> DebtRollup {
    let pick = |f: fn(&RatingRecord) -> &Option<String>| {
        record
            .and_then(|r| f(r).clone())
            .filter(|s| !s.trim().is_empty())
    };
    let moodys = pick(|r| &r.moodys);
    let sp = pick(|r| &r.sp);
    let fitch = pick(|r| &r.fitch);

    let moodys_u = moodys.as_deref().and_then(normalize);
    let sp_u = sp.as_deref().and_then(normalize);
    let fitch_u = fitch.as_deref().and_then(normalize);

    let scores: Vec<u8> = [moodys_u, sp_u, fitch_u]
        .into_iter()
        .flatten()
        .map(UnifiedMark::score)
        .collect();

    let avg_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64)
    };
    // A lone agency yields 0, no agencies yields None
    let dispersion = match (scores.iter().max(), scores.iter().min()) {
        (Some(hi), Some(lo)) => Some(hi - lo),
        _ => None,
    };

    DebtRollup {
        issuer: issuer.to_string(),
        moodys,
        sp,
        fitch,
        moodys_u,
        sp_u,
        fitch_u,
        avg_score,
        dispersion,
        total_face: acc.total,
        wam_years: if acc.total > 0.0 {
            acc.weighted_years / acc.total
        } else {
            0.0
        },
        next_12m: acc.next_12m,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn bond(id: &str, issuer: &str, face: f64, days_out: i64) -> Bond {
        Bond {
            id: id.to_string(),
            issuer_ticker: issuer.to_string(),
            label: id.to_string(),
            face_value: face,
            coupon: 0.03,
            issue_date: None,
            maturity_date: (now() + Duration::days(days_out)).date_naive(),
            rating: None,
        }
    }

    fn rated(issuer: &str, m: Option<&str>, s: Option<&str>, f: Option<&str>) -> RatingRecord {
        RatingRecord {
            issuer_ticker: issuer.to_string(),
            moodys: m.map(str::to_string),
            sp: s.map(str::to_string),
            fitch: f.map(str::to_string),
        }
    }

    #[test]
    fn test_next_12m_boundary() {
        let bonds = vec![bond("B1", "ACME", 100.0, 365), bond("B2", "ACME", 50.0, 400)];
        let rows = rollup_as_of(&bonds, &[], now());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].next_12m, 100.0);
        assert_eq!(rows[0].total_face, 150.0);
    }

    #[test]
    fn test_matured_bonds_count_as_due() {
        let rows = rollup_as_of(&[bond("B1", "ACME", 100.0, -30)], &[], now());
        assert_eq!(rows[0].next_12m, 100.0);
        assert_eq!(rows[0].wam_years, 0.0);
    }

    #[test]
    fn test_wam_is_face_weighted() {
        let bonds = vec![bond("B1", "ACME", 300.0, 0), bond("B2", "ACME", 100.0, 1461)];
        let rows = rollup_as_of(&bonds, &[], now());
        // 1461 days is exactly four 365.25-day years
        assert!((rows[0].wam_years - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_face_has_zero_wam() {
        let rows = rollup_as_of(&[bond("B1", "ACME", 0.0, 800)], &[], now());
        assert_eq!(rows[0].wam_years, 0.0);
        assert_eq!(rows[0].total_face, 0.0);
    }

    #[test]
    fn test_dispersion_three_agencies() {
        let rows = rollup_as_of(
            &[bond("B1", "AAA", 500e6, 700)],
            &[rated("AAA", Some("Aa2"), Some("AA"), Some("AA-"))],
            now(),
        );
        let r = &rows[0];
        assert_eq!(r.moodys_u, Some(UnifiedMark::Aa));
        // scores 3, 3, 4
        assert_eq!(r.dispersion, Some(1));
        assert!((r.avg_score.unwrap() - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_agency_dispersion_is_zero() {
        let rows = rollup_as_of(
            &[bond("B1", "ACME", 1.0, 700)],
            &[rated("ACME", None, Some("BBB"), None)],
            now(),
        );
        assert_eq!(rows[0].dispersion, Some(0));
        assert_eq!(rows[0].avg_score, Some(9.0));
    }

    #[test]
    fn test_unrated_issuer_has_no_dispersion() {
        let rows = rollup_as_of(
            &[bond("B1", "ACME", 1.0, 700)],
            &[rated("ACME", Some("NR"), None, None)],
            now(),
        );
        let r = &rows[0];
        assert_eq!(r.moodys.as_deref(), Some("NR"));
        assert_eq!(r.moodys_u, None);
        assert_eq!(r.dispersion, None);
        assert_eq!(r.avg_score, None);
        assert_eq!(r.display_moodys(), "NR [—]");
        assert_eq!(r.display_sp(), "— [—]");
    }

    #[test]
    fn test_issuers_in_first_appearance_order() {
        let bonds = vec![
            bond("B1", "ZZZ", 1.0, 10),
            bond("B2", "AAA", 1.0, 10),
            bond("B3", "ZZZ", 1.0, 10),
            bond("B4", "", 1.0, 10),
        ];
        let issuers: Vec<_> = rollup_as_of(&bonds, &[], now())
            .into_iter()
            .map(|r| r.issuer)
            .collect();
        assert_eq!(issuers, vec!["ZZZ", "AAA"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(rollup(&[], &[]).is_empty());
    }
}
