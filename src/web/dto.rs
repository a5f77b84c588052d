//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::engine::RouteResult;
use crate::planner::JourneyLeg;

/// Query parameters for `/api/route`.
#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    /// Source node id
    pub from: i64,

    /// Target node id
    pub to: i64,

    /// Walking speed in m/s (defaults to 1.4)
    pub speed: Option<f64>,

    /// Output format: `json` (default) or `geojson`
    pub format: Option<String>,
}

/// A walking route in plain JSON form.
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub nodes: Vec<i64>,
    pub distance_m: f64,
    pub duration_seconds: f64,
}

impl From<&RouteResult> for RouteResponse {
    fn from(result: &RouteResult) -> Self {
        Self {
            nodes: result.nodes.iter().map(|n| n.0).collect(),
            distance_m: result.distance_m,
            duration_seconds: result.duration_seconds,
        }
    }
}

/// Query parameters for `/api/transit`.
#[derive(Debug, Deserialize)]
pub struct TransitQuery {
    /// Source stop id
    pub from: String,

    /// Target stop id
    pub to: String,

    /// Departure time as HH:MM:SS (defaults to 08:00:00)
    pub time: Option<String>,
}

/// A transit journey in JSON form.
#[derive(Debug, Serialize)]
pub struct TransitResponse {
    /// Earliest arrival at the target, HH:MM:SS
    pub arrival: String,

    /// Journey legs in travel order
    pub legs: Vec<LegResponse>,
}

/// One journey leg.
#[derive(Debug, Serialize)]
pub struct LegResponse {
    /// `"ride"` or `"transfer"`
    pub kind: &'static str,
    pub from_stop: String,
    pub to_stop: String,
    /// Trip id for ride legs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
}

impl From<&JourneyLeg> for LegResponse {
    fn from(leg: &JourneyLeg) -> Self {
        match leg {
            JourneyLeg::Ride {
                from_stop,
                to_stop,
                trip_id,
            } => Self {
                kind: "ride",
                from_stop: from_stop.to_string(),
                to_stop: to_stop.to_string(),
                trip_id: Some(trip_id.to_string()),
            },
            JourneyLeg::Transfer { from_stop, to_stop } => Self {
                kind: "transfer",
                from_stop: from_stop.to_string(),
                to_stop: to_stop.to_string(),
                trip_id: None,
            },
        }
    }
}

/// A route as a GeoJSON FeatureCollection holding one LineString.
///
/// Coordinates follow the GeoJSON convention: longitude first.
pub fn route_to_geojson(result: &RouteResult) -> serde_json::Value {
    let coordinates: Vec<[f64; 2]> = result
        .coordinates
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(|&(lat, lon)| [lon, lat])
        .collect();

    serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates,
            },
            "properties": {
                "distance_m": result.distance_m,
                "duration_seconds": result.duration_seconds,
            },
        }],
    })
}
