//! HTTP route handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::domain::{MobilityProfile, StopId, TransitTime};
use crate::engine::{EngineError, RouteRequest, TransitRequest};
use crate::graph::NodeId;
use crate::planner::RouteError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/route", get(walking_route))
        .route("/api/transit", get(transit_route))
        .route("/api/graph", get(graph_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0} not loaded")]
    NotLoaded(&'static str),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotLoaded(what) => AppError::NotLoaded(what),
            EngineError::Route(RouteError::NodeNotFound(id)) => {
                AppError::NotFound(format!("node {id} not found"))
            }
            EngineError::Route(RouteError::NoPath) => AppError::NotFound("no path".to_owned()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotLoaded(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        warn!(%status, error = %self, "request failed");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Walking route between two graph nodes.
async fn walking_route(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> Result<Response, AppError> {
    let wants_geojson = query.format.as_deref() == Some("geojson");

    let request = RouteRequest {
        from: NodeId(query.from),
        to: NodeId(query.to),
        profile: MobilityProfile::walking(query.speed.unwrap_or(0.0)),
        include_coordinates: wants_geojson,
    };

    let result = state.engine.route(&request)?;

    if wants_geojson {
        Ok(Json(route_to_geojson(&result)).into_response())
    } else {
        Ok(Json(RouteResponse::from(&result)).into_response())
    }
}

/// Transit journey between two stops.
async fn transit_route(
    State(state): State<AppState>,
    Query(query): Query<TransitQuery>,
) -> Result<Json<TransitResponse>, AppError> {
    let departure = query
        .time
        .as_deref()
        .unwrap_or("08:00:00")
        .parse::<TransitTime>()
        .map_err(|e| AppError::BadRequest(format!("invalid time: {e}")))?;

    let request = TransitRequest {
        from_stop: StopId::from(query.from.as_str()),
        departure,
    };
    let target = StopId::from(query.to.as_str());

    match state.engine.transit_journey(&request, &target)? {
        Some((arrival, legs)) => Ok(Json(TransitResponse {
            arrival: arrival.to_string(),
            legs: legs.iter().map(LegResponse::from).collect(),
        })),
        None => Err(AppError::NotFound(format!(
            "stop {target} is not reachable from {} at {departure}",
            request.from_stop
        ))),
    }
}

/// Node and edge counts of the loaded graph.
async fn graph_stats(State(state): State<AppState>) -> Json<crate::engine::GraphStats> {
    Json(state.engine.stats())
}
