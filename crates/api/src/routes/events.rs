//! Route definitions for the `/events` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Routes mounted at `/events`.
///
/// ```text
/// GET    /                 -> list
/// POST   /                 -> create (admin)
/// GET    /{id}             -> get_by_id
/// PUT    /{id}             -> update (admin)
/// DELETE /{id}             -> delete (admin)
/// POST   /{id}/register    -> register (auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list).post(events::create))
        .route(
            "/{id}",
            get(events::get_by_id)
                .put(events::update)
                .delete(events::delete),
        )
        .route("/{id}/register", post(events::register))
}
