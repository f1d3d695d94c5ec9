//! Route definitions for the `/bookings` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::bookings;
use crate::state::AppState;

/// Routes mounted at `/bookings`. All require auth.
///
/// ```text
/// GET  /               -> list_mine
/// POST /               -> create
/// GET  /{id}           -> get_by_id (owner or admin)
/// POST /{id}/cancel    -> cancel (owner or admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(bookings::list_mine).post(bookings::create))
        .route("/{id}", get(bookings::get_by_id))
        .route("/{id}/cancel", post(bookings::cancel))
}
