use axum::routing::get;
use axum::Router;

use crate::handlers::layouts;
use crate::state::AppState;

/// Layout artifact and display configuration routes.
///
/// ```text
/// GET    /layouts/{id}     -> get_layout
/// GET    /layout/config    -> get_layout_config
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/layouts/{id}", get(layouts::get_layout))
        .route("/layout/config", get(layouts::get_layout_config))
}
