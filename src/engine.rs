//! Engine facade.
//!
//! Owns the street graph and the transit index, and exposes the embedding
//! API: ingest, cache round-trip, walking routes, transit searches, and a
//! couple of lookups. Construction happens once at startup; afterwards the
//! engine is read-only and can be shared freely across request handlers.

use std::path::Path;

use tracing::{info, instrument};

use crate::domain::{MobilityProfile, StopId, TransitTime};
use crate::graph::{cache, cache::CacheError, NodeId, StreetGraph};
use crate::gtfs::{self, GtfsError, StopTimeIndex};
use crate::osm::{self, OsmError, WayFilter};
use crate::planner::{
    a_star, distance_heuristic, FootpathTransfer, JourneyLeg, RaptorRouter, RouteError,
    StreetPath, TransferTable,
};

/// Error surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A query arrived before the matching ingest.
    #[error("{0} not loaded")]
    NotLoaded(&'static str),

    #[error(transparent)]
    Osm(#[from] OsmError),

    #[error(transparent)]
    Gtfs(#[from] GtfsError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// A walking route request between two graph nodes.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub from: NodeId,
    pub to: NodeId,
    pub profile: MobilityProfile,
    pub include_coordinates: bool,
}

/// A resolved walking route.
#[derive(Debug, Clone)]
pub struct RouteResult {
    /// Node ids in travel order.
    pub nodes: Vec<NodeId>,
    /// (lat, lon) per node, present when requested.
    pub coordinates: Option<Vec<(f64, f64)>>,
    /// Total distance in meters.
    pub distance_m: f64,
    /// Estimated duration in seconds at the profile's speed.
    pub duration_seconds: f64,
}

/// A transit route request.
#[derive(Debug, Clone)]
pub struct TransitRequest {
    pub from_stop: StopId,
    pub departure: TransitTime,
}

/// Node and edge counts of the loaded street graph.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
}

/// The long-lived owner of both routing cores.
#[derive(Debug, Default)]
pub struct Engine {
    graph: Option<StreetGraph>,
    transit_index: Option<StopTimeIndex>,
    transfers: TransferTable,
}

impl Engine {
    /// Create an engine with nothing loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an OSM file (`.osm` or `.osm.gz`) and build the street graph.
    #[instrument(skip(self))]
    pub fn load_osm(&mut self, path: &Path) -> Result<(), EngineError> {
        let snapshot = osm::parse_file(path)?;
        self.graph = Some(osm::build_graph(&snapshot, &WayFilter::default()));
        Ok(())
    }

    /// Save the built street graph to the cache file at `path`.
    pub fn save_graph(&self, path: &Path) -> Result<(), EngineError> {
        let graph = self.graph()?;
        cache::save(graph, path)?;
        Ok(())
    }

    /// Load a street graph previously saved with [`Engine::save_graph`].
    pub fn load_graph(&mut self, path: &Path) -> Result<(), EngineError> {
        self.graph = Some(cache::load(path)?);
        Ok(())
    }

    /// Parse GTFS files from `dir` and build the transit index.
    ///
    /// `stop_times.txt` and `trips.txt` are required; `transfers.txt` is
    /// used when present. A failed parse leaves the engine without a
    /// transit index rather than with a partial one.
    #[instrument(skip(self))]
    pub fn load_gtfs(&mut self, dir: &Path) -> Result<(), EngineError> {
        self.transit_index = None;
        self.transfers.clear();

        let stop_times = gtfs::parse_stop_times_file(&dir.join("stop_times.txt"))?;
        let trip_routes = gtfs::parse_trips_file(&dir.join("trips.txt"))?;

        let transfers_path = dir.join("transfers.txt");
        if transfers_path.exists() {
            for record in gtfs::parse_transfers_file(&transfers_path)? {
                self.transfers
                    .entry(record.from_stop_id)
                    .or_default()
                    .push(FootpathTransfer {
                        to: record.to_stop_id,
                        duration_seconds: record.min_transfer_time as i32,
                    });
            }
        }

        self.transit_index = Some(gtfs::build_index(&stop_times, &trip_routes));
        info!(
            stop_times = stop_times.len(),
            trips = trip_routes.len(),
            "transit index ready"
        );
        Ok(())
    }

    /// Find a walking route between two graph nodes.
    ///
    /// The search itself minimizes distance with a distance heuristic; the
    /// profile only converts the resulting distance into a duration.
    pub fn route(&self, request: &RouteRequest) -> Result<RouteResult, EngineError> {
        let graph = self.graph()?;

        let path = a_star(graph, request.from, request.to, distance_heuristic)?;

        Ok(self.resolve_path(graph, path, &request.profile, request.include_coordinates))
    }

    fn resolve_path(
        &self,
        graph: &StreetGraph,
        path: StreetPath,
        profile: &MobilityProfile,
        include_coordinates: bool,
    ) -> RouteResult {
        let coordinates = include_coordinates.then(|| {
            path.nodes
                .iter()
                .filter_map(|id| graph.node(*id).map(|n| (n.lat, n.lon)))
                .collect()
        });

        RouteResult {
            duration_seconds: profile.travel_time(path.total_cost),
            distance_m: path.total_cost,
            coordinates,
            nodes: path.nodes,
        }
    }

    /// Run a RAPTOR search from a stop.
    pub fn transit_route(
        &self,
        request: &TransitRequest,
    ) -> Result<crate::planner::RaptorResult, EngineError> {
        let index = self
            .transit_index
            .as_ref()
            .ok_or(EngineError::NotLoaded("GTFS data"))?;

        let router = RaptorRouter::new(index, &self.transfers);
        Ok(router.search(&request.from_stop, request.departure))
    }

    /// Earliest arrival and reconstructed journey for a target stop.
    pub fn transit_journey(
        &self,
        request: &TransitRequest,
        target: &StopId,
    ) -> Result<Option<(TransitTime, Vec<JourneyLeg>)>, EngineError> {
        let result = self.transit_route(request)?;

        Ok(result.earliest_arrival(target).map(|arrival| {
            let legs = result.reconstruct(target).unwrap_or_default();
            (arrival, legs)
        }))
    }

    /// The graph node nearest to a coordinate, with its distance in meters.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Result<(NodeId, f64), EngineError> {
        self.graph()?
            .nearest_node(lat, lon)
            .ok_or(EngineError::NotLoaded("street graph"))
    }

    /// Node and edge counts of the loaded graph (zeros when unloaded).
    pub fn stats(&self) -> GraphStats {
        match &self.graph {
            Some(graph) => GraphStats {
                nodes: graph.node_count(),
                edges: graph.edge_count(),
            },
            None => GraphStats::default(),
        }
    }

    /// Borrow the loaded street graph.
    pub fn graph(&self) -> Result<&StreetGraph, EngineError> {
        self.graph
            .as_ref()
            .ok_or(EngineError::NotLoaded("street graph"))
    }

    /// Whether a street graph has been loaded.
    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }

    /// Whether a transit index has been loaded.
    pub fn has_transit(&self) -> bool {
        self.transit_index.is_some()
    }
}
