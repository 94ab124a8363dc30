pub mod generate;
pub mod health;
pub mod layouts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate                      create and start a job (POST)
/// /generate/{id}/status          job record (GET)
/// /generate/{id}/stream          log stream, SSE (GET)
///
/// /layouts/{id}                  generated layout text (GET)
/// /layout/config                 display configuration (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/generate", generate::router())
        .merge(layouts::router())
}
