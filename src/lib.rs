//! Market Intelligence Graph - Rust Core
//!
//! Analytics over company, bond, rating and deal snapshots:
//!
//! - Graph unifier: entities + derived debt/bank nodes, type-weighted edges
//! - Debt rollups: face, WAM, 12m redemptions, normalized agency ratings
//! - League table: bookrunners credited with full deal value
//! - Centrality: weighted degree on the visible graph
//! - Alerts: redemption, pulse, dispersion, headline and bookrunner rules
//!
//! Built with the `python` feature this is also the dashboard's extension
//! module.

pub mod alerts;
pub mod centrality;
pub mod debt;
pub mod format;
pub mod graph;
pub mod ingest;
pub mod league;
pub mod model;
pub mod pipeline;
pub mod pulse;
pub mod ratings;
pub mod scheduler;

#[cfg(feature = "python")]
mod python;

pub use alerts::{scan, Alert, AlertConfig, AlertKind, ScanInput, Severity};
pub use centrality::weighted_degree;
pub use debt::{rollup, DebtRollup};
pub use graph::{unify, GraphView, UnifiedGraph, WeightMultipliers};
pub use league::{league, LeagueRow, LeagueTable, RankBy};
pub use model::{Bond, Deal, Edge, Node, NodeKind, RatingRecord};
pub use pipeline::{analyze, Analysis, Settings, Snapshot};
pub use ratings::{normalize, score_of, UnifiedMark};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn market_graph(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_class::<python::MarketGraph>()?;
    Ok(())
}
