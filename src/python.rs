//! PyO3 bindings for the dashboard
//!
//! Datasets go in as JSON row arrays; every getter recomputes from the
//! current snapshot and returns JSON.

use crate::alerts::{scan, AlertConfig, ScanInput};
use crate::centrality::{top_by_degree, weighted_degree};
use crate::debt::rollup;
use crate::graph::{unify, GraphStats, GraphView, UnifiedGraph, WeightMultipliers};
use crate::ingest;
use crate::league::{LeagueTable, RankBy};
use crate::pipeline::{Settings, Snapshot};
use crate::pulse::{feed, FeedInput, NewsItem};
use chrono::Utc;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use serde::Serialize;
use std::sync::Mutex;

fn value_err(e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<PyValueError, _>(e.to_string())
}

fn to_json<T: Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))
}

#[derive(Default)]
struct State {
    snapshot: Snapshot,
    settings: Settings,
    news: Vec<NewsItem>,
}

impl State {
    fn graph(&self) -> UnifiedGraph {
        let s = &self.snapshot;
        unify(&s.nodes, &s.edges, &s.bonds, &s.deals, &self.settings.multipliers)
    }
}

/// Market intelligence graph over the loaded datasets
#[pyclass]
pub struct MarketGraph {
    inner: Mutex<State>,
}

impl MarketGraph {
    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> PyResult<R>) -> PyResult<R> {
        let mut state = self
            .inner
            .lock()
            .map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))?;
        f(&mut state)
    }
}

#[pymethods]
impl MarketGraph {
    #[new]
    fn new() -> Self {
        Self {
            inner: Mutex::new(State::default()),
        }
    }

    fn load_nodes(&self, rows_json: &str) -> PyResult<usize> {
        let rows = ingest::parse_rows(rows_json).map_err(value_err)?;
        self.with_state(|s| {
            s.snapshot.nodes = ingest::nodes(&rows);
            Ok(s.snapshot.nodes.len())
        })
    }

    fn load_edges(&self, rows_json: &str) -> PyResult<usize> {
        let rows = ingest::parse_rows(rows_json).map_err(value_err)?;
        self.with_state(|s| {
            s.snapshot.edges = ingest::edges(&rows);
            Ok(s.snapshot.edges.len())
        })
    }

    fn load_bonds(&self, rows_json: &str) -> PyResult<usize> {
        let rows = ingest::parse_rows(rows_json).map_err(value_err)?;
        self.with_state(|s| {
            s.snapshot.bonds = ingest::bonds(&rows);
            Ok(s.snapshot.bonds.len())
        })
    }

    fn load_ratings(&self, rows_json: &str) -> PyResult<usize> {
        let rows = ingest::parse_rows(rows_json).map_err(value_err)?;
        self.with_state(|s| {
            s.snapshot.ratings = ingest::ratings(&rows);
            Ok(s.snapshot.ratings.len())
        })
    }

    fn load_deals(&self, rows_json: &str) -> PyResult<usize> {
        let rows = ingest::parse_rows(rows_json).map_err(value_err)?;
        self.with_state(|s| {
            s.snapshot.deals = ingest::deals(&rows);
            Ok(s.snapshot.deals.len())
        })
    }

    fn load_news(&self, items_json: &str) -> PyResult<usize> {
        let items: Vec<NewsItem> = serde_json::from_str(items_json).map_err(value_err)?;
        self.with_state(|s| {
            s.news = items;
            Ok(s.news.len())
        })
    }

    fn set_multiplier(&self, tag: &str, value: f64) -> PyResult<()> {
        self.with_state(|s| s.settings.multipliers.set(tag, value).map_err(value_err))
    }

    fn set_multipliers(&self, json: &str) -> PyResult<()> {
        let multipliers = WeightMultipliers::from_json(json).map_err(value_err)?;
        self.with_state(|s| {
            s.settings.multipliers = multipliers;
            Ok(())
        })
    }

    fn set_alert_config(&self, json: &str) -> PyResult<()> {
        let config = AlertConfig::from_json(json).map_err(value_err)?;
        self.with_state(|s| {
            s.settings.alerts = config;
            Ok(())
        })
    }

    #[pyo3(signature = (include_persons=false, include_banks=true, focus_deals=true))]
    fn set_view(&self, include_persons: bool, include_banks: bool, focus_deals: bool) -> PyResult<()> {
        self.with_state(|s| {
            s.settings.view = GraphView {
                include_persons,
                include_banks,
                focus_deals,
            };
            Ok(())
        })
    }

    /// Scan interval in seconds after the floor is applied
    fn scan_interval_secs(&self) -> PyResult<f64> {
        self.with_state(|s| Ok(s.settings.alerts.scan_interval().as_secs_f64()))
    }

    /// Unified graph as shown, `{"nodes": [...], "edges": [...]}`
    #[pyo3(signature = (filtered=true))]
    fn graph(&self, filtered: bool) -> PyResult<String> {
        self.with_state(|s| {
            let g = s.graph();
            if filtered {
                to_json(&g.filtered(&s.settings.view))
            } else {
                to_json(&g)
            }
        })
    }

    fn stats(&self) -> PyResult<String> {
        self.with_state(|s| to_json(&GraphStats::of(&s.graph().filtered(&s.settings.view))))
    }

    fn rollups(&self) -> PyResult<String> {
        self.with_state(|s| to_json(&rollup(&s.snapshot.bonds, &s.snapshot.ratings)))
    }

    #[pyo3(signature = (rank_by="value", top_n=5))]
    fn league(&self, rank_by: &str, top_n: usize) -> PyResult<String> {
        let by = RankBy::parse(rank_by)
            .ok_or_else(|| value_err(format!("Unknown ranking: {}", rank_by)))?;
        self.with_state(|s| {
            let table = LeagueTable::build(&s.snapshot.deals, by);
            let rows: Vec<serde_json::Value> = table
                .top(top_n)
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "bank": r.bank,
                        "deals": r.deals,
                        "total": r.total,
                        "avg": r.avg,
                        "share": table.share(r),
                    })
                })
                .collect();
            to_json(&rows)
        })
    }

    fn weighted_degree(&self) -> PyResult<String> {
        self.with_state(|s| {
            let view = s.graph().filtered(&s.settings.view);
            to_json(&weighted_degree(&view.nodes, &view.edges))
        })
    }

    #[pyo3(signature = (n=5))]
    fn top_by_degree(&self, n: usize) -> PyResult<Vec<(String, f64)>> {
        self.with_state(|s| {
            let view = s.graph().filtered(&s.settings.view);
            let degree = weighted_degree(&view.nodes, &view.edges);
            Ok(top_by_degree(&view.nodes, &degree, n)
                .into_iter()
                .map(|(node, score)| (node.id.clone(), score))
                .collect())
        })
    }

    /// Run the alert scan on the current view
    fn scan(&self) -> PyResult<String> {
        self.with_state(|s| {
            let view = s.graph().filtered(&s.settings.view);
            let input = ScanInput {
                nodes: &view.nodes,
                edges: &view.edges,
                bonds: &s.snapshot.bonds,
                ratings: &s.snapshot.ratings,
                deals: &s.snapshot.deals,
            };
            to_json(&scan(&input, &s.settings.alerts))
        })
    }

    /// Pulse feed over the full scaled graph
    fn pulse(&self) -> PyResult<String> {
        self.with_state(|s| {
            let g = s.graph();
            let input = FeedInput {
                edges: &g.edges,
                bonds: &s.snapshot.bonds,
                ratings: &s.snapshot.ratings,
                deals: &s.snapshot.deals,
                news: &s.news,
            };
            to_json(&feed(&input, Utc::now()))
        })
    }

    fn __repr__(&self) -> String {
        match self.inner.lock() {
            Ok(s) => format!(
                "MarketGraph(nodes={}, edges={}, bonds={}, deals={})",
                s.snapshot.nodes.len(),
                s.snapshot.edges.len(),
                s.snapshot.bonds.len(),
                s.snapshot.deals.len()
            ),
            Err(_) => "MarketGraph(<poisoned>)".to_string(),
        }
    }
}
