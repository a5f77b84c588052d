//! Street routing graph.
//!
//! A directed weighted graph over OSM node ids. Edge weights are metric
//! distances; a bidirectional street is stored as two directed edges. The
//! graph is built once by the OSM ingest and read-only afterwards.

pub mod cache;

use std::collections::HashMap;
use std::fmt;

use crate::domain::geo::haversine_distance;

/// An OSM node identifier.
///
/// Taken verbatim from the source data and treated as opaque. The value 0 is
/// reserved to mean "unset" and never appears in a built graph.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// A graph node with its WGS-84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreetNode {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

/// An outgoing edge, weighted by distance in meters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreetEdge {
    pub to: NodeId,
    pub distance_m: f64,
}

/// Directed weighted street graph.
#[derive(Debug, Clone, Default)]
pub struct StreetGraph {
    nodes: HashMap<NodeId, StreetNode>,
    edges: HashMap<NodeId, Vec<StreetEdge>>,
}

impl StreetGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, overwriting any previous node with the same id.
    pub fn add_node(&mut self, id: NodeId, lat: f64, lon: f64) {
        self.nodes.insert(id, StreetNode { id, lat, lon });
    }

    /// Append a directed edge.
    ///
    /// Duplicates are permitted; the caller ensures both endpoints exist.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, distance_m: f64) {
        self.edges
            .entry(from)
            .or_default()
            .push(StreetEdge { to, distance_m });
    }

    /// Append a pair of directed edges, one in each direction.
    pub fn add_bidirectional_edge(&mut self, a: NodeId, b: NodeId, distance_m: f64) {
        self.add_edge(a, b, distance_m);
        self.add_edge(b, a, distance_m);
    }

    /// Outgoing edges of a node; empty for unknown nodes.
    pub fn neighbors(&self, id: NodeId) -> &[StreetEdge] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the node is present in the graph.
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&StreetNode> {
        self.nodes.get(&id)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Iterate over all nodes in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &StreetNode> {
        self.nodes.values()
    }

    /// Iterate over (from, edges) adjacency entries in unspecified order.
    pub fn adjacency(&self) -> impl Iterator<Item = (NodeId, &[StreetEdge])> {
        self.edges.iter().map(|(id, edges)| (*id, edges.as_slice()))
    }

    /// The node closest to the given coordinate, with its distance in meters.
    ///
    /// Linear scan over all nodes. Ties go to the smaller node id so the
    /// result does not depend on map iteration order.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Option<(NodeId, f64)> {
        let mut best: Option<(NodeId, f64)> = None;

        for node in self.nodes.values() {
            let dist = haversine_distance(lat, lon, node.lat, node.lon);
            let better = match best {
                None => true,
                Some((best_id, best_dist)) => {
                    dist < best_dist || (dist == best_dist && node.id < best_id)
                }
            };
            if better {
                best = Some((node.id, dist));
            }
        }

        best
    }
}
