//! Weighted-degree centrality over a unified graph snapshot

use crate::model::{Edge, Node};
use std::collections::HashMap;

/// Sum of incident edge weights per node.
///
/// Every node starts at 0. An edge endpoint that is not a known node is
/// skipped on its own; the other endpoint still counts. Self-loops count twice.
pub fn weighted_degree(nodes: &[Node], edges: &[Edge]) -> HashMap<String, f64> {
    let mut degree: HashMap<String, f64> = nodes.iter().map(|n| (n.id.clone(), 0.0)).collect();

    for edge in edges {
        for end in [&edge.source, &edge.target] {
            if let Some(d) = degree.get_mut(end.as_str()) {
                *d += edge.weight;
            }
        }
    }

    degree
}

/// The `n` most connected nodes, highest score first
pub fn top_by_degree<'a>(
    nodes: &'a [Node],
    degree: &HashMap<String, f64>,
    n: usize,
) -> Vec<(&'a Node, f64)> {
    let mut scored: Vec<(&Node, f64)> = nodes
        .iter()
        .map(|node| (node, degree.get(&node.id).copied().unwrap_or(0.0)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(n);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;

    fn nodes(ids: &[&str]) -> Vec<Node> {
        ids.iter()
            .map(|id| Node::new(*id, *id, NodeKind::Company))
            .collect()
    }

    #[test]
    fn test_single_edge() {
        let d = weighted_degree(&nodes(&["A", "B"]), &[Edge::new("A", "B", "X", 2.0)]);
        assert_eq!(d["A"], 2.0);
        assert_eq!(d["B"], 2.0);
    }

    #[test]
    fn test_self_loop_counts_twice() {
        let d = weighted_degree(&nodes(&["A"]), &[Edge::new("A", "A", "X", 1.5)]);
        assert_eq!(d["A"], 3.0);
    }

    #[test]
    fn test_unknown_endpoint_skipped_alone() {
        let d = weighted_degree(
            &nodes(&["A", "C"]),
            &[Edge::new("A", "GHOST", "X", 1.0), Edge::new("GHOST", "GHOST", "X", 9.0)],
        );
        assert_eq!(d["A"], 1.0);
        assert_eq!(d["C"], 0.0);
        assert!(!d.contains_key("GHOST"));
    }

    #[test]
    fn test_top_by_degree() {
        let ns = nodes(&["A", "B", "C"]);
        let edges = vec![Edge::new("A", "B", "X", 1.0), Edge::new("B", "C", "X", 2.0)];
        let d = weighted_degree(&ns, &edges);
        let top = top_by_degree(&ns, &d, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0.id, "B");
        assert_eq!(top[0].1, 3.0);
        assert_eq!(top[1].0.id, "C");
    }
}
