//! Bookrunner league table
//!
//! Every listed bookrunner is credited the full deal value and one deal;
//! co-leads do not split credit.

use crate::model::Deal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueRow {
    pub bank: String,
    pub deals: u32,
    pub total: f64,
    pub avg: f64,
}

/// Aggregate deals by credited bookrunner, in order of first appearance
pub fn league(deals: &[Deal]) -> Vec<LeagueRow> {
    let mut rows: Vec<LeagueRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for deal in deals {
        for bank in deal.bookrunners() {
            let i = *index.entry(bank).or_insert_with(|| {
                rows.push(LeagueRow {
                    bank: bank.to_string(),
                    deals: 0,
                    total: 0.0,
                    avg: 0.0,
                });
                rows.len() - 1
            });
            rows[i].deals += 1;
            rows[i].total += deal.value_usd;
        }
    }

    for row in &mut rows {
        row.avg = if row.deals > 0 {
            row.total / f64::from(row.deals)
        } else {
            0.0
        };
    }
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    /// Total credited value, then deal count
    #[default]
    Value,
    /// Deal count, then total credited value
    Count,
}

impl RankBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "value" => Some(RankBy::Value),
            "count" => Some(RankBy::Count),
            _ => None,
        }
    }
}

/// Sort rows for display. Stable, so ties keep first-appearance order.
pub fn rank(mut rows: Vec<LeagueRow>, by: RankBy) -> Vec<LeagueRow> {
    rows.sort_by(|x, y| match by {
        RankBy::Value => y
            .total
            .total_cmp(&x.total)
            .then_with(|| y.deals.cmp(&x.deals)),
        RankBy::Count => y
            .deals
            .cmp(&x.deals)
            .then_with(|| y.total.total_cmp(&x.total)),
    });
    rows
}

/// Ranked league with market share against the whole table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueTable {
    pub rank_by: RankBy,
    pub rows: Vec<LeagueRow>,
    pub grand_total: f64,
}

impl LeagueTable {
    pub fn build(deals: &[Deal], rank_by: RankBy) -> Self {
        let rows = rank(league(deals), rank_by);
        let grand_total = rows.iter().map(|r| r.total).sum();
        Self {
            rank_by,
            rows,
            grand_total,
        }
    }

    pub fn top(&self, n: usize) -> &[LeagueRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Share of all credited value, `None` when nothing was credited
    pub fn share(&self, row: &LeagueRow) -> Option<f64> {
        if self.grand_total > 0.0 {
            Some(row.total / self.grand_total)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_credit_to_every_bookrunner() {
        let deals = vec![Deal::new("A", "B", 100.0, "X;Y"), Deal::new("C", "D", 200.0, "X")];
        let rows = league(&deals);
        let x = rows.iter().find(|r| r.bank == "X").unwrap();
        assert_eq!(x.total, 300.0);
        assert_eq!(x.deals, 2);
        assert_eq!(x.avg, 150.0);
        let y = rows.iter().find(|r| r.bank == "Y").unwrap();
        assert_eq!(y.total, 100.0);
        assert_eq!(y.deals, 1);
    }

    #[test]
    fn test_deal_without_bookrunners() {
        assert!(league(&[Deal::new("A", "B", 100.0, "")]).is_empty());
        assert!(league(&[]).is_empty());
    }

    #[test]
    fn test_ranking_modes() {
        let deals = vec![
            Deal::new("A", "B", 1_000.0, "Big"),
            Deal::new("A", "B", 10.0, "Busy"),
            Deal::new("A", "B", 10.0, "Busy"),
            Deal::new("A", "B", 10.0, "Busy"),
        ];
        let by_value = rank(league(&deals), RankBy::Value);
        assert_eq!(by_value[0].bank, "Big");
        let by_count = rank(league(&deals), RankBy::Count);
        assert_eq!(by_count[0].bank, "Busy");
        assert_eq!(RankBy::parse("COUNT"), Some(RankBy::Count));
        assert_eq!(RankBy::parse("share"), None);
    }

    #[test]
    fn test_table_share_and_top() {
        let deals = vec![Deal::new("A", "B", 300.0, "X"), Deal::new("A", "B", 100.0, "Y")];
        let table = LeagueTable::build(&deals, RankBy::Value);
        assert_eq!(table.top(1).len(), 1);
        assert_eq!(table.top(10).len(), 2);
        assert_eq!(table.share(&table.rows[0]), Some(0.75));

        let empty = LeagueTable::build(&[Deal::new("A", "B", 0.0, "X")], RankBy::Value);
        assert_eq!(empty.share(&empty.rows[0]), None);
    }
}
