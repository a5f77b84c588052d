//! HTTP API over the engine.
//!
//! A thin axum layer: handlers translate query parameters into engine
//! requests and engine results into JSON or GeoJSON. All state is built
//! before the server starts and shared read-only.

mod dto;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
