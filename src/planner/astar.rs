//! A* shortest-path search over the street graph.
//!
//! Standard best-first search on `f = g + h`. The binary heap has no
//! decrease-key, so improved nodes are pushed again and stale entries are
//! skipped when popped; with an admissible, consistent heuristic the first
//! non-stale pop of a node carries its optimal cost.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use tracing::debug;

use crate::domain::geo::haversine_distance;
use crate::graph::{NodeId, StreetGraph, StreetNode};

/// Straight-line distance heuristic, in meters.
///
/// Admissible and consistent for distance-weighted graphs: the great-circle
/// distance never exceeds any path along graph edges.
pub fn distance_heuristic(from: &StreetNode, to: &StreetNode) -> f64 {
    haversine_distance(from.lat, from.lon, to.lat, to.lon)
}

/// Straight-line travel-time heuristic at a fixed speed, in seconds.
///
/// Only admissible against time-valued edge weights. Pairing it with the
/// meter-weighted street graph understates or overstates the remaining
/// cost depending on the speed, so [`a_star`] callers on that graph want
/// [`distance_heuristic`] instead.
pub fn time_heuristic(speed_mps: f64) -> impl Fn(&StreetNode, &StreetNode) -> f64 {
    move |from, to| {
        if speed_mps <= 0.0 {
            return 0.0;
        }
        haversine_distance(from.lat, from.lon, to.lat, to.lon) / speed_mps
    }
}

/// Error from a street route query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// Source or target is not a node of the graph.
    #[error("node {0} not found in graph")]
    NodeNotFound(NodeId),

    /// The open set drained without reaching the target.
    #[error("no path found")]
    NoPath,
}

/// A found path through the street graph.
#[derive(Debug, Clone, PartialEq)]
pub struct StreetPath {
    /// Visited nodes in source-to-target order.
    pub nodes: Vec<NodeId>,
    /// Sum of edge weights along `nodes`.
    pub total_cost: f64,
}

impl StreetPath {
    /// Number of nodes on the path.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the path is empty (never true for a returned path).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// An open-set entry. Ordered as a min-heap on `f`, with the node id as a
/// deterministic tie-break.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    f: f64,
    g: f64,
    node: NodeId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.node == other.node
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap. Edge weights are finite, so
        // partial_cmp only fails on NaN fed in by a broken heuristic.
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a minimum-cost path from `source` to `target`.
///
/// The heuristic receives the candidate node and the target node and must
/// never overestimate the remaining cost **in the units of the edge
/// weights** — the graph weighs edges in meters, so a distance heuristic
/// (or zero) keeps the search exact, while a time-valued heuristic paired
/// with distance costs forfeits optimality.
///
/// Returns [`RouteError::NodeNotFound`] if either endpoint is absent and
/// [`RouteError::NoPath`] if the endpoints are disconnected. When `source`
/// equals `target` the result is a single-node path of cost 0.
pub fn a_star(
    graph: &StreetGraph,
    source: NodeId,
    target: NodeId,
    heuristic: impl Fn(&StreetNode, &StreetNode) -> f64,
) -> Result<StreetPath, RouteError> {
    let source_node = graph.node(source).ok_or(RouteError::NodeNotFound(source))?;
    let target_node = graph.node(target).ok_or(RouteError::NodeNotFound(target))?;

    if source == target {
        return Ok(StreetPath {
            nodes: vec![source],
            total_cost: 0.0,
        });
    }

    let mut g_score: HashMap<NodeId, f64> = HashMap::from([(source, 0.0)]);
    let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();

    let mut open = BinaryHeap::new();
    open.push(Candidate {
        f: heuristic(source_node, target_node),
        g: 0.0,
        node: source,
    });

    let mut popped = 0u64;

    while let Some(candidate) = open.pop() {
        popped += 1;

        if candidate.node == target {
            let path = reconstruct(&came_from, target, g_score[&target]);
            debug!(popped, cost = path.total_cost, nodes = path.len(), "route found");
            return Ok(path);
        }

        // A cheaper entry for this node was already popped.
        if g_score
            .get(&candidate.node)
            .is_some_and(|&g| candidate.g > g)
        {
            continue;
        }

        for edge in graph.neighbors(candidate.node) {
            let tentative = candidate.g + edge.distance_m;
            if g_score.get(&edge.to).is_none_or(|&g| tentative < g) {
                let Some(next_node) = graph.node(edge.to) else {
                    continue;
                };

                g_score.insert(edge.to, tentative);
                came_from.insert(edge.to, candidate.node);
                open.push(Candidate {
                    f: tentative + heuristic(next_node, target_node),
                    g: tentative,
                    node: edge.to,
                });
            }
        }
    }

    debug!(popped, "open set drained without reaching target");
    Err(RouteError::NoPath)
}

fn reconstruct(came_from: &HashMap<NodeId, NodeId>, target: NodeId, total_cost: f64) -> StreetPath {
    let mut nodes = vec![target];
    let mut current = target;

    while let Some(&prev) = came_from.get(&current) {
        nodes.push(prev);
        current = prev;
    }

    nodes.reverse();
    StreetPath { nodes, total_cost }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::geo::haversine_distance;
    use proptest::prelude::*;

    /// A random geographic graph: nodes on a small lat/lon patch, edges
    /// weighted by their true haversine distance (keeps the heuristic
    /// admissible and consistent).
    fn geo_graph() -> impl Strategy<Value = StreetGraph> {
        (
            prop::collection::vec((0.0f64..0.05, 0.0f64..0.05), 2..12),
            prop::collection::vec((0usize..12, 0usize..12), 1..30),
        )
            .prop_map(|(coords, links)| {
                let mut g = StreetGraph::new();
                for (i, (lat, lon)) in coords.iter().enumerate() {
                    g.add_node(NodeId(i as i64 + 1), *lat, *lon);
                }
                for (a, b) in links {
                    let (a, b) = (a % coords.len(), b % coords.len());
                    if a == b {
                        continue;
                    }
                    let (alat, alon) = coords[a];
                    let (blat, blon) = coords[b];
                    let d = haversine_distance(alat, alon, blat, blon);
                    g.add_bidirectional_edge(NodeId(a as i64 + 1), NodeId(b as i64 + 1), d);
                }
                g
            })
    }

    proptest! {
        /// The haversine-guided search returns the same cost as an unguided
        /// (Dijkstra-equivalent) search, and its reported cost equals the
        /// sum of edge weights along the returned path.
        #[test]
        fn guided_search_is_exact(g in geo_graph()) {
            let source = NodeId(1);
            for target in g.nodes().map(|n| n.id) {
                let unguided = a_star(&g, source, target, |_, _| 0.0);
                let guided = a_star(&g, source, target, |from, to| {
                    haversine_distance(from.lat, from.lon, to.lat, to.lon)
                });

                match (unguided, guided) {
                    (Ok(reference), Ok(found)) => {
                        prop_assert!((reference.total_cost - found.total_cost).abs() < 1e-6);
                        prop_assert_eq!(found.nodes.first(), Some(&source));
                        prop_assert_eq!(found.nodes.last(), Some(&target));

                        let mut sum = 0.0;
                        for pair in found.nodes.windows(2) {
                            let edge = g.neighbors(pair[0]).iter().find(|e| e.to == pair[1]);
                            prop_assert!(edge.is_some());
                            sum += edge.unwrap().distance_m;
                        }
                        prop_assert!((found.total_cost - sum).abs() < 1e-6);
                    }
                    (Err(RouteError::NoPath), Err(RouteError::NoPath)) => {}
                    (a, b) => prop_assert!(false, "searches disagree: {a:?} vs {b:?}"),
                }
            }
        }
    }
}
