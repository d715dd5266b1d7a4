//! One-call analysis over an immutable snapshot.
//!
//! `analyze` recomputes every derived structure from scratch; nothing is
//! cached between calls.

use crate::alerts::{scan_as_of, Alert, AlertConfig, ScanInput};
use crate::centrality::weighted_degree;
use crate::debt::{rollup_as_of, DebtRollup};
use crate::graph::{unify, GraphView, UnifiedGraph, WeightMultipliers};
use crate::league::{league, LeagueRow};
use crate::model::{Bond, Deal, Edge, Node, RatingRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Input datasets as supplied by the ingestion layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub bonds: Vec<Bond>,
    #[serde(default)]
    pub ratings: Vec<RatingRecord>,
    #[serde(default)]
    pub deals: Vec<Deal>,
}

/// Caller-tunable knobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub multipliers: WeightMultipliers,
    pub view: GraphView,
    pub alerts: AlertConfig,
}

/// Everything the presentation layer reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub computed_at: DateTime<Utc>,
    /// Unified graph, scaled, before view filtering
    pub graph: UnifiedGraph,
    /// Graph as shown: what centrality and alerts ran on
    pub view: UnifiedGraph,
    pub rollups: Vec<DebtRollup>,
    pub league: Vec<LeagueRow>,
    pub degree: HashMap<String, f64>,
    pub alerts: Vec<Alert>,
}

pub fn analyze(snapshot: &Snapshot, settings: &Settings, now: DateTime<Utc>) -> Analysis {
    let graph = unify(
        &snapshot.nodes,
        &snapshot.edges,
        &snapshot.bonds,
        &snapshot.deals,
        &settings.multipliers,
    );
    let view = graph.filtered(&settings.view);
    let degree = weighted_degree(&view.nodes, &view.edges);

    let input = ScanInput {
        nodes: &view.nodes,
        edges: &view.edges,
        bonds: &snapshot.bonds,
        ratings: &snapshot.ratings,
        deals: &snapshot.deals,
    };
    let alerts = scan_as_of(&input, &settings.alerts, now);

    log::debug!(
        "Analysis: {} nodes in view, {} alerts",
        view.nodes.len(),
        alerts.len()
    );

    Analysis {
        computed_at: now,
        rollups: rollup_as_of(&snapshot.bonds, &snapshot.ratings, now),
        league: league(&snapshot.deals),
        graph,
        view,
        degree,
        alerts,
    }
}
