//! On-disk street graph cache.
//!
//! Parsing a metropolitan OSM extract dominates startup time, so the built
//! graph can be persisted and reloaded. The byte format is an implementation
//! detail and not wire-stable; a version field guards against reading bytes
//! written by a different build of this crate.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{NodeId, StreetEdge, StreetGraph, StreetNode};

/// Version stamp written into every cache file.
///
/// Bump on any change to the serialized shape; readers reject mismatches.
const CACHE_VERSION: u32 = 2;

/// Error raised while saving or loading a cached graph.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("unsupported cache version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    nodes: Vec<StreetNode>,
    adjacency: Vec<(NodeId, Vec<StreetEdge>)>,
}

/// Write the graph to `path`, replacing any existing file.
pub fn save(graph: &StreetGraph, path: &Path) -> Result<(), CacheError> {
    let file = CacheFile {
        version: CACHE_VERSION,
        nodes: graph.nodes().copied().collect(),
        adjacency: graph
            .adjacency()
            .map(|(id, edges)| (id, edges.to_vec()))
            .collect(),
    };

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &file)?;

    info!(path = %path.display(), nodes = file.nodes.len(), "saved graph cache");
    Ok(())
}

/// Read a graph previously written by [`save`].
///
/// Fails with [`CacheError::UnsupportedVersion`] when the file was written
/// by an incompatible build.
pub fn load(path: &Path) -> Result<StreetGraph, CacheError> {
    let reader = BufReader::new(File::open(path)?);
    let file: CacheFile = serde_json::from_reader(reader)?;

    if file.version != CACHE_VERSION {
        return Err(CacheError::UnsupportedVersion {
            found: file.version,
            expected: CACHE_VERSION,
        });
    }

    let mut graph = StreetGraph::new();
    for node in &file.nodes {
        graph.add_node(node.id, node.lat, node.lon);
    }
    for (from, edges) in &file.adjacency {
        for edge in edges {
            graph.add_edge(*from, edge.to, edge.distance_m);
        }
    }

    info!(path = %path.display(), nodes = graph.node_count(), "loaded graph cache");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> StreetGraph {
        let mut g = StreetGraph::new();
        g.add_node(NodeId(1), 52.50, 13.40);
        g.add_node(NodeId(2), 52.51, 13.41);
        g.add_node(NodeId(3), 52.52, 13.42);
        g.add_bidirectional_edge(NodeId(1), NodeId(2), 120.5);
        g.add_edge(NodeId(2), NodeId(3), 300.0);
        g
    }

    #[test]
    fn round_trip_preserves_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.cache");

        let original = sample_graph();
        save(&original, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.node_count(), original.node_count());
        assert_eq!(loaded.edge_count(), original.edge_count());
        assert_eq!(loaded.node(NodeId(2)), original.node(NodeId(2)));
        assert_eq!(loaded.neighbors(NodeId(2)), original.neighbors(NodeId(2)));
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.cache");

        let file = CacheFile {
            version: CACHE_VERSION + 1,
            nodes: vec![],
            adjacency: vec![],
        };
        serde_json::to_writer(File::create(&path).unwrap(), &file).unwrap();

        match load(&path) {
            Err(CacheError::UnsupportedVersion { found, expected }) => {
                assert_eq!(found, CACHE_VERSION + 1);
                assert_eq!(expected, CACHE_VERSION);
            }
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_garbage_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.cache");
        std::fs::write(&path, b"not a cache").unwrap();

        assert!(matches!(load(&path), Err(CacheError::Encoding(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.cache");
        assert!(matches!(load(&path), Err(CacheError::Io(_))));
    }
}
