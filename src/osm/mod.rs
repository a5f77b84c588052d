//! OpenStreetMap ingest.
//!
//! Reads an OSM XML 0.6 snapshot (optionally gzip-compressed), applies a
//! walkability filter to its ways, and builds the street routing graph.
//! Unknown XML elements and attributes are ignored.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::domain::geo::haversine_distance;
use crate::graph::{NodeId, StreetGraph};

/// Error raised while reading OSM data.
#[derive(Debug, thiserror::Error)]
pub enum OsmError {
    #[error("osm io: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("element <{element}> has invalid attribute {attribute}")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
    },
}

/// A raw OSM node: a tagged coordinate.
#[derive(Debug, Clone)]
pub struct OsmNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: HashMap<String, String>,
}

/// A raw OSM way: an ordered list of node references plus tags.
#[derive(Debug, Clone)]
pub struct OsmWay {
    pub id: i64,
    pub node_refs: Vec<i64>,
    pub tags: HashMap<String, String>,
}

/// A parsed OSM snapshot, before any filtering.
#[derive(Debug, Default)]
pub struct OsmSnapshot {
    pub nodes: HashMap<i64, OsmNode>,
    pub ways: Vec<OsmWay>,
}

/// Parse an OSM XML document.
pub fn parse_xml(xml: &str) -> Result<OsmSnapshot, OsmError> {
    let doc = roxmltree::Document::parse(xml)?;

    let mut snapshot = OsmSnapshot::default();

    for element in doc.root_element().children().filter(|c| c.is_element()) {
        match element.tag_name().name() {
            "node" => {
                let id = parse_attr(&element, "node", "id")?;
                let lat = parse_attr(&element, "node", "lat")?;
                let lon = parse_attr(&element, "node", "lon")?;
                snapshot.nodes.insert(
                    id,
                    OsmNode {
                        id,
                        lat,
                        lon,
                        tags: collect_tags(&element),
                    },
                );
            }
            "way" => {
                let id = parse_attr(&element, "way", "id")?;
                let node_refs = element
                    .children()
                    .filter(|c| c.has_tag_name("nd"))
                    .map(|nd| {
                        nd.attribute("ref")
                            .and_then(|r| r.parse().ok())
                            .ok_or(OsmError::InvalidAttribute {
                                element: "nd",
                                attribute: "ref",
                            })
                    })
                    .collect::<Result<Vec<i64>, _>>()?;
                snapshot.ways.push(OsmWay {
                    id,
                    node_refs,
                    tags: collect_tags(&element),
                });
            }
            _ => {}
        }
    }

    debug!(
        nodes = snapshot.nodes.len(),
        ways = snapshot.ways.len(),
        "parsed OSM snapshot"
    );
    Ok(snapshot)
}

fn parse_attr<T: std::str::FromStr>(
    element: &roxmltree::Node<'_, '_>,
    name: &'static str,
    attribute: &'static str,
) -> Result<T, OsmError> {
    element
        .attribute(attribute)
        .and_then(|v| v.parse().ok())
        .ok_or(OsmError::InvalidAttribute {
            element: name,
            attribute,
        })
}

fn collect_tags(element: &roxmltree::Node<'_, '_>) -> HashMap<String, String> {
    element
        .children()
        .filter(|c| c.has_tag_name("tag"))
        .filter_map(|tag| {
            let k = tag.attribute("k")?;
            let v = tag.attribute("v")?;
            Some((k.to_owned(), v.to_owned()))
        })
        .collect()
}

/// Parse an OSM file, transparently gunzipping `.gz` inputs.
pub fn parse_file(path: &Path) -> Result<OsmSnapshot, OsmError> {
    let mut file = File::open(path)?;
    let mut xml = String::new();

    if path.extension() == Some(std::ffi::OsStr::new("gz")) {
        GzDecoder::new(file).read_to_string(&mut xml)?;
    } else {
        file.read_to_string(&mut xml)?;
    }

    parse_xml(&xml)
}

/// Highway values considered traversable on foot by default.
pub const WALKABLE_HIGHWAYS: [&str; 13] = [
    "footway",
    "path",
    "pedestrian",
    "steps",
    "residential",
    "living_street",
    "service",
    "track",
    "unclassified",
    "tertiary",
    "secondary",
    "primary",
    "trunk",
];

/// Decides which ways become part of the routing graph.
#[derive(Debug, Clone)]
pub struct WayFilter {
    /// Accepted `highway` tag values.
    pub include_highways: HashSet<String>,
}

impl Default for WayFilter {
    fn default() -> Self {
        Self {
            include_highways: WALKABLE_HIGHWAYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl WayFilter {
    /// Whether a way is open to pedestrians.
    ///
    /// `foot=no` and `access=private` reject outright; otherwise the way
    /// must carry a `highway` tag from the accepted set. No other tag is
    /// consulted.
    pub fn is_walkable(&self, way: &OsmWay) -> bool {
        if way.tags.get("foot").is_some_and(|v| v == "no") {
            return false;
        }
        if way.tags.get("access").is_some_and(|v| v == "private") {
            return false;
        }

        way.tags
            .get("highway")
            .is_some_and(|h| self.include_highways.contains(h))
    }
}

/// Build the street graph from a snapshot.
///
/// Graph nodes are exactly the node refs that appear in at least one
/// walkable way and resolve in the node table; everything else is dropped.
/// Each consecutive resolving pair of refs on a walkable way yields a
/// bidirectional edge weighted by haversine distance. `oneway` tags are not
/// enforced: every walkable edge is traversable in both directions.
pub fn build_graph(snapshot: &OsmSnapshot, filter: &WayFilter) -> StreetGraph {
    let mut graph = StreetGraph::new();

    let walkable: Vec<&OsmWay> = snapshot
        .ways
        .iter()
        .filter(|w| filter.is_walkable(w))
        .collect();

    let mut referenced: HashSet<i64> = HashSet::new();
    for way in &walkable {
        referenced.extend(way.node_refs.iter().copied());
    }

    for id in &referenced {
        if let Some(node) = snapshot.nodes.get(id) {
            graph.add_node(NodeId(node.id), node.lat, node.lon);
        }
    }

    for way in &walkable {
        for pair in way.node_refs.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let (Some(from_node), Some(to_node)) =
                (snapshot.nodes.get(&from), snapshot.nodes.get(&to))
            else {
                continue;
            };

            let distance =
                haversine_distance(from_node.lat, from_node.lon, to_node.lat, to_node.lon);
            graph.add_bidirectional_edge(NodeId(from), NodeId(to), distance);
        }
    }

    info!(
        ways = walkable.len(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built street graph"
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn way(tags: &[(&str, &str)]) -> OsmWay {
        OsmWay {
            id: 1,
            node_refs: vec![],
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn filter_accepts_walkable_highways() {
        let filter = WayFilter::default();
        for highway in WALKABLE_HIGHWAYS {
            assert!(
                filter.is_walkable(&way(&[("highway", highway)])),
                "{highway} should be walkable"
            );
        }
    }

    #[test]
    fn filter_rejects_foot_no_and_private() {
        let filter = WayFilter::default();
        assert!(!filter.is_walkable(&way(&[("highway", "residential"), ("foot", "no")])));
        assert!(!filter.is_walkable(&way(&[
            ("highway", "residential"),
            ("access", "private")
        ])));
    }

    #[test]
    fn filter_rejects_missing_or_unknown_highway() {
        let filter = WayFilter::default();
        assert!(!filter.is_walkable(&way(&[("name", "Main St")])));
        assert!(!filter.is_walkable(&way(&[("highway", "motorway")])));
        assert!(!filter.is_walkable(&way(&[("highway", "cycleway")])));
    }

    #[test]
    fn filter_custom_set() {
        let filter = WayFilter {
            include_highways: ["cycleway".to_string()].into_iter().collect(),
        };
        assert!(filter.is_walkable(&way(&[("highway", "cycleway")])));
        assert!(!filter.is_walkable(&way(&[("highway", "footway")])));
    }

    const MINI_OSM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <node id="1" lat="52.5200" lon="13.4000"/>
  <node id="2" lat="52.5210" lon="13.4010"/>
  <node id="3" lat="52.5220" lon="13.4020"/>
  <node id="4" lat="52.5230" lon="13.4030"/>
  <way id="100">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="highway" v="footway"/>
  </way>
  <way id="101">
    <nd ref="2"/>
    <nd ref="4"/>
    <tag k="highway" v="motorway"/>
  </way>
  <way id="102">
    <nd ref="3"/>
    <nd ref="4"/>
    <tag k="highway" v="residential"/>
    <tag k="foot" v="no"/>
  </way>
</osm>"#;

    #[test]
    fn parse_mini_snapshot() {
        let snapshot = parse_xml(MINI_OSM).unwrap();

        assert_eq!(snapshot.nodes.len(), 4);
        assert_eq!(snapshot.ways.len(), 3);

        let node = &snapshot.nodes[&1];
        assert_eq!(node.lat, 52.5200);
        assert_eq!(node.lon, 13.4000);

        let footway = &snapshot.ways[0];
        assert_eq!(footway.node_refs, vec![1, 2, 3]);
        assert_eq!(footway.tags["highway"], "footway");
    }

    #[test]
    fn build_keeps_only_walkable_ways() {
        let snapshot = parse_xml(MINI_OSM).unwrap();
        let graph = build_graph(&snapshot, &WayFilter::default());

        // Node 4 appears only on the motorway and the foot=no way
        assert!(graph.has_node(NodeId(1)));
        assert!(graph.has_node(NodeId(2)));
        assert!(graph.has_node(NodeId(3)));
        assert!(!graph.has_node(NodeId(4)));

        assert_eq!(graph.neighbors(NodeId(1)).len(), 1);
        assert_eq!(graph.neighbors(NodeId(2)).len(), 2);

        let from_two: Vec<NodeId> = graph.neighbors(NodeId(2)).iter().map(|e| e.to).collect();
        assert!(from_two.contains(&NodeId(1)));
        assert!(from_two.contains(&NodeId(3)));
    }

    #[test]
    fn build_skips_unresolvable_refs() {
        let xml = r#"<osm>
          <node id="1" lat="0.0" lon="0.0"/>
          <node id="2" lat="0.0" lon="0.001"/>
          <way id="1">
            <nd ref="1"/>
            <nd ref="99"/>
            <nd ref="2"/>
            <tag k="highway" v="path"/>
          </way>
        </osm>"#;

        let snapshot = parse_xml(xml).unwrap();
        let graph = build_graph(&snapshot, &WayFilter::default());

        // The dangling ref contributes no node and breaks the chain
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn parse_rejects_malformed_xml() {
        assert!(matches!(parse_xml("<osm><node"), Err(OsmError::Xml(_))));
    }

    #[test]
    fn parse_rejects_bad_coordinates() {
        let xml = r#"<osm><node id="1" lat="abc" lon="0.0"/></osm>"#;
        assert!(matches!(
            parse_xml(xml),
            Err(OsmError::InvalidAttribute {
                element: "node",
                attribute: "lat",
            })
        ));
    }

    #[test]
    fn parse_ignores_unknown_elements() {
        let xml = r#"<osm>
          <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
          <node id="1" lat="0.5" lon="0.5"/>
          <relation id="7"><member type="way" ref="1"/></relation>
        </osm>"#;

        let snapshot = parse_xml(xml).unwrap();
        assert_eq!(snapshot.nodes.len(), 1);
        assert!(snapshot.ways.is_empty());
    }

    #[test]
    fn parse_file_handles_gzip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mini.osm.gz");

        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(MINI_OSM.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let snapshot = parse_file(&path).unwrap();
        assert_eq!(snapshot.nodes.len(), 4);
        assert_eq!(snapshot.ways.len(), 3);
    }
}
