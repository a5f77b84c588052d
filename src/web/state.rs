//! Application state for the web layer.

use std::sync::Arc;

use crate::engine::Engine;

/// Shared application state: the engine, fully loaded before serving.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    /// Wrap a loaded engine for sharing across handlers.
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
