//! Route definitions for the `/admin` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET    /dashboard                      -> dashboard
/// GET    /users                          -> list_users
/// GET    /users/{id}                     -> get_user
/// PUT    /users/{id}                     -> update_user
/// DELETE /users/{id}                     -> deactivate_user
/// GET    /bookings                       -> list_bookings
/// PUT    /bookings/{id}/status           -> update_booking_status
/// GET    /contact-messages               -> list_contact_messages
/// PUT    /contact-messages/{id}/read     -> mark_contact_message_read
/// DELETE /contact-messages/{id}          -> delete_contact_message
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::deactivate_user),
        )
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/{id}/status", put(admin::update_booking_status))
        .route("/contact-messages", get(admin::list_contact_messages))
        .route(
            "/contact-messages/{id}",
            axum::routing::delete(admin::delete_contact_message),
        )
        .route(
            "/contact-messages/{id}/read",
            put(admin::mark_contact_message_read),
        )
}
