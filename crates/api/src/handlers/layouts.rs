//! Handlers for generated layouts and the display configuration.

use axum::extract::State;
use axum::extract::Path;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use copilot_core::display_config::load_display_config;
use copilot_core::error::CoreError;

use crate::error::{AppError, AppResult};
use crate::handlers::generate::parse_job_id;
use crate::state::AppState;

/// Media type of the generator's artifact.
const LAYOUT_CONTENT_TYPE: &str = "application/yaml";

/// GET /api/layouts/{id}
///
/// Only available once the job has completed. The artifact is returned
/// as written by the generator.
pub async fn get_layout(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job_id = parse_job_id(&id)?;
    let path = state.engine.completed_output(job_id).await?;

    let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::Core(CoreError::NotFound {
                entity: "Layout file",
                id: job_id.to_string(),
            })
        } else {
            AppError::InternalError(format!("Failed to read {}: {e}", path.display()))
        }
    })?;

    Ok(([(CONTENT_TYPE, LAYOUT_CONTENT_TYPE)], text))
}

/// GET /api/layout/config
///
/// Re-read from disk on every request so edits apply without a restart.
pub async fn get_layout_config(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let config = load_display_config(&state.config.display_config_path).await?;
    Ok(Json(config))
}
