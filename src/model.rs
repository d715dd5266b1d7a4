//! Snapshot records shared by every analysis stage.
//!
//! Records are plain serde types. They arrive already validated (see
//! [`crate::ingest`]) and are never mutated by the analysis code.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const COMPANY_PREFIX: &str = "COMP:";
pub const BOND_PREFIX: &str = "BOND:";
pub const BANK_PREFIX: &str = "BANK:";

/// Separator between subtype labels in a compound edge tag
pub const TAG_SEPARATOR: char = '|';

/// Kind of entity a node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Company,
    Bank,
    Debt,
    Person,
    Institution,
}

impl NodeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "company" => Some(NodeKind::Company),
            "bank" => Some(NodeKind::Bank),
            "debt" => Some(NodeKind::Debt),
            "person" => Some(NodeKind::Person),
            "institution" => Some(NodeKind::Institution),
            _ => None,
        }
    }
}

/// A node in the unified graph, identified by its namespaced id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

/// A weighted relationship. `kind` is a compound tag such as
/// `MENTION|STRATEGIC_PARTNER`; each label is a subtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub weight: f64,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: kind.into(),
            weight,
            attributes: BTreeMap::new(),
        }
    }

    pub fn subtypes(&self) -> impl Iterator<Item = &str> {
        self.kind.split(TAG_SEPARATOR)
    }

    /// Substring match against the whole tag, so `DEAL` matches `DEAL|BOOKRUNNER`
    pub fn tag_contains(&self, needle: &str) -> bool {
        self.kind.contains(needle)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// A single bond outstanding for an issuer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub id: String,
    pub issuer_ticker: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub face_value: f64,
    #[serde(default)]
    pub coupon: f64,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    pub maturity_date: NaiveDate,
    #[serde(default)]
    pub rating: Option<String>,
}

impl Bond {
    /// Node id for the derived Debt node, `BOND:` prefixed exactly once
    pub fn node_id(&self) -> String {
        if self.id.starts_with(BOND_PREFIX) {
            self.id.clone()
        } else {
            format!("{}{}", BOND_PREFIX, self.id)
        }
    }

    pub fn issuer_node_id(&self) -> String {
        format!("{}{}", COMPANY_PREFIX, self.issuer_ticker)
    }
}

/// Agency-native ratings for one issuer (wide shape)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub issuer_ticker: String,
    #[serde(default)]
    pub moodys: Option<String>,
    #[serde(default)]
    pub sp: Option<String>,
    #[serde(default)]
    pub fitch: Option<String>,
}

/// A company-to-company deal with its mandated bookrunners
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub company_a: String,
    pub company_b: String,
    #[serde(default)]
    pub deal_type: Option<String>,
    #[serde(default)]
    pub announced_date: Option<NaiveDate>,
    #[serde(default)]
    pub value_usd: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default, deserialize_with = "deserialize_bookrunners")]
    pub bookrunners: Vec<String>,
}

impl Deal {
    pub fn new(company_a: &str, company_b: &str, value_usd: f64, bookrunners: &str) -> Self {
        Self {
            company_a: company_a.to_string(),
            company_b: company_b.to_string(),
            value_usd,
            bookrunners: split_bookrunners(bookrunners),
            ..Default::default()
        }
    }

    /// Bookrunner names, trimmed with empty entries removed
    pub fn bookrunners(&self) -> impl Iterator<Item = &str> {
        self.bookrunners
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
    }

    /// Non-empty deal participants
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        [self.company_a.as_str(), self.company_b.as_str()]
            .into_iter()
            .filter(|c| !c.is_empty())
    }
}

/// Split a free-text bookrunner field on `;` or `,`
pub fn split_bookrunners(field: &str) -> Vec<String> {
    field
        .split(|c| c == ';' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BookrunnerField {
    Text(String),
    List(Vec<String>),
}

fn deserialize_bookrunners<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let field = Option::<BookrunnerField>::deserialize(deserializer)?;
    Ok(match field {
        None => Vec::new(),
        Some(BookrunnerField::Text(s)) => split_bookrunners(&s),
        Some(BookrunnerField::List(list)) => list
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    })
}
