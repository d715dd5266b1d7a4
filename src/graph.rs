//! Graph unifier
//!
//! Merges entity nodes/edges with the nodes and edges derived from bonds and
//! deals into one snapshot, then scales every edge by its relationship-type
//! multipliers.
//!
//! Derived pieces:
//! - each bond becomes a Debt node linked from its issuer (`DEBT_SECURITY`)
//! - each deal becomes a `DEAL|<TYPE>` edge between its two companies
//! - each bookrunner becomes a Bank node linked to both deal companies

use crate::model::{Bond, Deal, Edge, Node, NodeKind, BANK_PREFIX};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

pub const DEBT_SECURITY: &str = "DEBT_SECURITY";
pub const DEAL: &str = "DEAL";
pub const BOOKRUNNER: &str = "BOOKRUNNER";
pub const BOARD_ROLE: &str = "BOARD_ROLE";

/// Relationship subtypes the desk tunes by default
pub const EDGE_TYPES: [&str; 10] = [
    "MENTION",
    "STRATEGIC_PARTNER",
    "SUPPLIER",
    "GEO_PROXIMITY",
    "NEWS_CO_MENTION",
    "MARKET_ACTIVITY",
    DEAL,
    DEBT_SECURITY,
    "CREDIT_RATING",
    BOOKRUNNER,
];

/// (floor, span) of the derived edge weight bands: debt [0.5, 2.0], deals [0.5, 2.5]
const DEBT_BAND: (f64, f64) = (0.5, 1.5);
const DEAL_BAND: (f64, f64) = (0.5, 2.0);

/// Tags kept when the view focuses on deal flow
const DEAL_FOCUS: [&str; 4] = [DEAL, "SUPPLIER", "STRATEGIC_PARTNER", BOOKRUNNER];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Multiplier for {tag} must be finite and positive, got {value}")]
    InvalidMultiplier { tag: String, value: f64 },
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config must be a JSON object")]
    NotAnObject,
}

/// Per-subtype edge weight multipliers. Unlisted subtypes scale by 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightMultipliers(BTreeMap<String, f64>);

impl Default for WeightMultipliers {
    fn default() -> Self {
        let mut m: BTreeMap<String, f64> =
            EDGE_TYPES.iter().map(|t| (t.to_string(), 1.0)).collect();
        m.insert(DEAL.to_string(), 1.5);
        m.insert(BOOKRUNNER.to_string(), 1.6);
        Self(m)
    }
}

impl WeightMultipliers {
    /// All subtypes at 1
    pub fn neutral() -> Self {
        Self(BTreeMap::new())
    }

    pub fn set(&mut self, tag: &str, value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::InvalidMultiplier {
                tag: tag.to_string(),
                value,
            });
        }
        self.0.insert(tag.to_string(), value);
        Ok(())
    }

    pub fn get(&self, tag: &str) -> f64 {
        self.0.get(tag).copied().unwrap_or(1.0)
    }

    /// Product of the multipliers of every subtype in a compound tag
    pub fn factor(&self, tag: &str) -> f64 {
        tag.split(crate::model::TAG_SEPARATOR)
            .map(|t| self.get(t))
            .product()
    }

    /// Parse `{"DEAL": 1.5, ...}`, rejecting non-positive values
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, f64> = serde_json::from_str(json)?;
        let mut out = Self::neutral();
        for (tag, value) in raw {
            out.set(&tag, value)?;
        }
        Ok(out)
    }
}

/// Unified node/edge snapshot after scaling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Build the unified graph from entity data plus bonds and deals
pub fn unify(
    entity_nodes: &[Node],
    entity_edges: &[Edge],
    bonds: &[Bond],
    deals: &[Deal],
    multipliers: &WeightMultipliers,
) -> UnifiedGraph {
    let (debt_nodes, debt_edges) = derive_debt(bonds);
    let deal_edges = derive_deal_edges(deals);
    let (bank_nodes, bank_edges) = derive_banks(deals);

    let nodes = dedup_nodes(
        entity_nodes
            .iter()
            .cloned()
            .chain(debt_nodes)
            .chain(bank_nodes),
    );

    let edges = entity_edges
        .iter()
        .cloned()
        .chain(debt_edges)
        .chain(deal_edges)
        .chain(bank_edges)
        .map(|e| scale_edge(e, multipliers))
        .collect::<Vec<_>>();

    log::debug!(
        "Unified graph: {} nodes, {} edges ({} bonds, {} deals)",
        nodes.len(),
        edges.len(),
        bonds.len(),
        deals.len()
    );

    UnifiedGraph { nodes, edges }
}

/// Multiply an edge's weight by the product of its subtype multipliers
pub fn scale_edge(mut edge: Edge, multipliers: &WeightMultipliers) -> Edge {
    edge.weight *= multipliers.factor(&edge.kind);
    edge
}

/// Linear map from `values` into `[base, base + span]`. The range always
/// includes 0 and 1 so a lone or constant value set never divides by zero.
struct MinMax {
    lo: f64,
    width: f64,
    base: f64,
    span: f64,
}

impl MinMax {
    fn over(values: impl Iterator<Item = f64>, (base, span): (f64, f64)) -> Self {
        let (lo, hi) = values.fold((0.0_f64, 1.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Self {
            lo,
            width: (hi - lo).max(1.0),
            base,
            span,
        }
    }

    fn apply(&self, v: f64) -> f64 {
        self.base + self.span * ((v - self.lo) / self.width)
    }
}

fn derive_debt(bonds: &[Bond]) -> (Vec<Node>, Vec<Edge>) {
    let scale = MinMax::over(bonds.iter().map(|b| b.face_value), DEBT_BAND);

    let nodes = bonds
        .iter()
        .map(|b| {
            let label = if b.label.is_empty() { &b.id } else { &b.label };
            let rating = b.rating.clone().map(Value::from).unwrap_or(Value::Null);
            Node::new(b.node_id(), label.clone(), NodeKind::Debt)
                .with_attribute("face_value", b.face_value)
                .with_attribute("rating", rating)
        })
        .collect();

    let edges = bonds
        .iter()
        .map(|b| {
            Edge::new(
                b.issuer_node_id(),
                b.node_id(),
                DEBT_SECURITY,
                scale.apply(b.face_value),
            )
        })
        .collect();

    (nodes, edges)
}

fn deal_scale(deals: &[Deal]) -> MinMax {
    MinMax::over(deals.iter().map(|d| d.value_usd), DEAL_BAND)
}

fn derive_deal_edges(deals: &[Deal]) -> Vec<Edge> {
    let scale = deal_scale(deals);
    deals
        .iter()
        .map(|d| {
            let deal_type = d
                .deal_type
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or("GENERIC")
                .to_uppercase();
            let mut edge = Edge::new(
                d.company_a.clone(),
                d.company_b.clone(),
                format!("{}|{}", DEAL, deal_type),
                scale.apply(d.value_usd),
            );
            edge.attributes.insert("value_usd".into(), d.value_usd.into());
            edge.attributes.insert("notes".into(), d.notes.clone().into());
            if let Some(date) = d.announced_date {
                edge.attributes
                    .insert("announced_date".into(), date.to_string().into());
            }
            edge
        })
        .collect()
}

fn derive_banks(deals: &[Deal]) -> (Vec<Node>, Vec<Edge>) {
    let scale = deal_scale(deals);
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let tag = format!("{}|{}", DEAL, BOOKRUNNER);

    for deal in deals {
        let weight = scale.apply(deal.value_usd);
        for bank in deal.bookrunners() {
            let id = format!("{}{}", BANK_PREFIX, bank);
            if seen.insert(id.clone()) {
                nodes.push(Node::new(id.clone(), bank, NodeKind::Bank));
            }
            for end in deal.participants() {
                edges.push(Edge::new(id.clone(), end, tag.clone(), weight));
            }
        }
    }

    (nodes, edges)
}

fn dedup_nodes(nodes: impl Iterator<Item = Node>) -> Vec<Node> {
    let mut seen = HashSet::new();
    nodes.filter(|n| seen.insert(n.id.clone())).collect()
}

/// Visibility toggles applied before centrality and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphView {
    pub include_persons: bool,
    pub include_banks: bool,
    pub focus_deals: bool,
}

impl Default for GraphView {
    fn default() -> Self {
        Self {
            include_persons: false,
            include_banks: true,
            focus_deals: true,
        }
    }
}

impl GraphView {
    /// Everything visible
    pub fn all() -> Self {
        Self {
            include_persons: true,
            include_banks: true,
            focus_deals: false,
        }
    }
}

impl UnifiedGraph {
    /// Apply a view. Edges lose their place when either endpoint is hidden.
    pub fn filtered(&self, view: &GraphView) -> UnifiedGraph {
        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .filter(|n| view.include_persons || n.kind != NodeKind::Person)
            .filter(|n| view.include_banks || n.kind != NodeKind::Bank)
            .cloned()
            .collect();
        let visible: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

        let edges = self
            .edges
            .iter()
            .filter(|e| visible.contains(e.source.as_str()) && visible.contains(e.target.as_str()))
            .filter(|e| !e.tag_contains(BOARD_ROLE))
            .filter(|e| !view.focus_deals || DEAL_FOCUS.iter().any(|t| e.tag_contains(t)))
            .cloned()
            .collect();

        UnifiedGraph { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Headline counts for a graph snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub total_weight: f64,
    pub deal_links: usize,
    pub banks: usize,
}

impl GraphStats {
    pub fn of(graph: &UnifiedGraph) -> Self {
        Self {
            nodes: graph.nodes.len(),
            edges: graph.edges.len(),
            total_weight: graph.edges.iter().map(|e| e.weight).sum(),
            deal_links: graph.edges.iter().filter(|e| e.tag_contains(DEAL)).count(),
            banks: graph
                .nodes
                .iter()
                .filter(|n| n.kind == NodeKind::Bank)
                .count(),
        }
    }
}
