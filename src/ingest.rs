//! Ingestion boundary
//!
//! Turns loosely typed rows (one JSON object per row, cells may be strings or
//! numbers) into validated records. Rows missing a required key are dropped
//! without failing the batch.

use crate::model::{split_bookrunners, Bond, Deal, Edge, Node, NodeKind, RatingRecord};
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a JSON array of rows")]
    NotAnArray,
}

/// Parse a JSON array of row objects
pub fn parse_rows(json: &str) -> Result<Vec<Value>, IngestError> {
    match serde_json::from_str(json)? {
        Value::Array(rows) => Ok(rows),
        _ => Err(IngestError::NotAnArray),
    }
}

fn text(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_any(row: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text(row, k))
}

fn number(row: &Map<String, Value>, key: &str) -> Option<f64> {
    let n = match row.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn date(row: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    text(row, key).as_deref().and_then(parse_date)
}

fn rows_as_objects<'a>(rows: &'a [Value], what: &'static str) -> impl Iterator<Item = &'a Map<String, Value>> {
    rows.iter().filter_map(move |r| {
        let obj = r.as_object();
        if obj.is_none() {
            log::debug!("Skipping non-object {} row", what);
        }
        obj
    })
}

/// Node rows need `id`, `label` and a known `type`; other columns become
/// attributes
pub fn nodes(rows: &[Value]) -> Vec<Node> {
    let out: Vec<Node> = rows_as_objects(rows, "node")
        .filter_map(|row| {
            let id = text(row, "id")?;
            let label = text(row, "label")?;
            let kind = text(row, "type").as_deref().and_then(NodeKind::parse);
            let Some(kind) = kind else {
                log::debug!("Dropping node {}: unknown type", id);
                return None;
            };
            let mut node = Node::new(id, label, kind);
            for (k, v) in row {
                if !matches!(k.as_str(), "id" | "label" | "type") && !v.is_null() {
                    node.attributes.insert(k.clone(), v.clone());
                }
            }
            Some(node)
        })
        .collect();
    log::debug!("Ingested {} of {} node rows", out.len(), rows.len());
    out
}

/// Edge rows need `source` and `target`. A missing, zero or unparseable
/// weight becomes 1.
pub fn edges(rows: &[Value]) -> Vec<Edge> {
    let out: Vec<Edge> = rows_as_objects(rows, "edge")
        .filter_map(|row| {
            let source = text(row, "source")?;
            let target = text(row, "target")?;
            let kind = text(row, "type").unwrap_or_default();
            let weight = number(row, "weight").filter(|w| *w > 0.0).unwrap_or(1.0);
            let mut edge = Edge::new(source, target, kind, weight);
            for (k, v) in row {
                if !matches!(k.as_str(), "source" | "target" | "type" | "weight") && !v.is_null() {
                    edge.attributes.insert(k.clone(), v.clone());
                }
            }
            Some(edge)
        })
        .collect();
    log::debug!("Ingested {} of {} edge rows", out.len(), rows.len());
    out
}

/// Bond rows need `id`, `issuer_ticker` and a parseable `maturity_date`
pub fn bonds(rows: &[Value]) -> Vec<Bond> {
    let out: Vec<Bond> = rows_as_objects(rows, "bond")
        .filter_map(|row| {
            let id = text(row, "id")?;
            let issuer_ticker = text(row, "issuer_ticker")?;
            let Some(maturity_date) = date(row, "maturity_date") else {
                log::debug!("Dropping bond {}: no maturity date", id);
                return None;
            };
            Some(Bond {
                label: text(row, "label").unwrap_or_else(|| id.clone()),
                id,
                issuer_ticker,
                face_value: number(row, "face_value").unwrap_or(0.0),
                coupon: number(row, "coupon").unwrap_or(0.0),
                issue_date: date(row, "issue_date"),
                maturity_date,
                rating: text(row, "rating"),
            })
        })
        .collect();
    log::debug!("Ingested {} of {} bond rows", out.len(), rows.len());
    out
}

fn bookrunner_cell(row: &Map<String, Value>) -> Vec<String> {
    match row.get("bookrunners") {
        Some(Value::String(s)) => split_bookrunners(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Deal rows need `company_a` and `company_b`
pub fn deals(rows: &[Value]) -> Vec<Deal> {
    let out: Vec<Deal> = rows_as_objects(rows, "deal")
        .filter_map(|row| {
            Some(Deal {
                company_a: text(row, "company_a")?,
                company_b: text(row, "company_b")?,
                deal_type: text(row, "deal_type"),
                announced_date: date(row, "announced_date"),
                value_usd: number(row, "value_usd").unwrap_or(0.0),
                notes: text(row, "notes").unwrap_or_default(),
                bookrunners: bookrunner_cell(row),
            })
        })
        .collect();
    log::debug!("Ingested {} of {} deal rows", out.len(), rows.len());
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Agency {
    Moodys,
    Sp,
    Fitch,
}

fn agency(name: &str) -> Option<Agency> {
    let name = name.to_lowercase();
    if name.contains("mood") {
        Some(Agency::Moodys)
    } else if name.contains("s&p") || name == "sp" || name.contains("standard") {
        Some(Agency::Sp)
    } else if name.contains("fitch") {
        Some(Agency::Fitch)
    } else {
        None
    }
}

/// Rating rows in either shape:
/// - wide: `issuer_ticker` (or `issuer`) with `moodys`/`sp`/`fitch` columns
/// - long: one row per agency with `agency` and `rating` columns
///
/// The shape is decided by the first row. Long rows are pivoted into one
/// wide record per issuer, later rows overwriting earlier ones per agency.
pub fn ratings(rows: &[Value]) -> Vec<RatingRecord> {
    let objects: Vec<&Map<String, Value>> = rows_as_objects(rows, "rating").collect();
    let is_long = objects
        .first()
        .map(|r| r.contains_key("agency") || r.contains_key("Agency"))
        .unwrap_or(false);

    let out = if is_long {
        pivot_long(&objects)
    } else {
        objects
            .iter()
            .filter_map(|row| {
                let record = RatingRecord {
                    issuer_ticker: text_any(row, &["issuer_ticker", "issuer"])?,
                    moodys: text(row, "moodys"),
                    sp: text(row, "sp"),
                    fitch: text(row, "fitch"),
                };
                let rated = record.moodys.is_some() || record.sp.is_some() || record.fitch.is_some();
                rated.then_some(record)
            })
            .collect()
    };
    log::debug!(
        "Ingested {} rating records from {} {} rows",
        out.len(),
        rows.len(),
        if is_long { "long" } else { "wide" }
    );
    out
}

fn pivot_long(rows: &[&Map<String, Value>]) -> Vec<RatingRecord> {
    let mut order: Vec<RatingRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(issuer) = text_any(row, &["issuer_ticker", "issuer"]) else {
            continue;
        };
        let i = *index.entry(issuer.clone()).or_insert_with(|| {
            order.push(RatingRecord {
                issuer_ticker: issuer.clone(),
                ..Default::default()
            });
            order.len() - 1
        });
        let mark = text_any(row, &["rating", "Rating"]);
        let record = &mut order[i];
        match text_any(row, &["agency", "Agency"]).as_deref().and_then(agency) {
            Some(Agency::Moodys) => record.moodys = mark,
            Some(Agency::Sp) => record.sp = mark,
            Some(Agency::Fitch) => record.fitch = mark,
            None => {}
        }
    }
    order
}
