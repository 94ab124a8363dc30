use std::sync::Arc;

use copilot_jobs::JobEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The job engine. Constructed once in `main` and injected here.
    pub engine: Arc<JobEngine>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
