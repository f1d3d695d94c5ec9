//! Route definitions for the `/coaches` resource and its slots.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::coaches;
use crate::state::AppState;

/// Routes mounted at `/coaches`.
///
/// ```text
/// GET    /                         -> list
/// POST   /                         -> create (admin)
/// GET    /{id}                     -> get_by_id
/// PUT    /{id}                     -> update (admin)
/// DELETE /{id}                     -> delete (admin, deactivates)
/// GET    /{id}/slots               -> list_slots
/// POST   /{id}/slots               -> create_slot (admin)
/// DELETE /{id}/slots/{slot_id}     -> delete_slot (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(coaches::list).post(coaches::create))
        .route(
            "/{id}",
            get(coaches::get_by_id)
                .put(coaches::update)
                .delete(coaches::delete),
        )
        .route(
            "/{id}/slots",
            get(coaches::list_slots).post(coaches::create_slot),
        )
        .route("/{id}/slots/{slot_id}", delete(coaches::delete_slot))
}
