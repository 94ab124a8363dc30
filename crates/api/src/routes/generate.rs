//! Route definitions for layout generation jobs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generate;
use crate::state::AppState;

/// Generation routes mounted at `/generate`.
///
/// ```text
/// POST   /               -> create_job
/// GET    /{id}/status    -> job_status
/// GET    /{id}/stream    -> stream_job_logs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generate::create_job))
        .route("/{id}/status", get(generate::job_status))
        .route("/{id}/stream", get(generate::stream_job_logs))
}
