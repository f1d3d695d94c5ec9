pub mod admin;
pub mod auth;
pub mod bookings;
pub mod coaches;
pub mod contact;
pub mod events;
pub mod health;
pub mod payments;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   local sign-up (public)
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (requires auth)
/// /auth/me                                         current user (requires auth)
/// /auth/{provider}                                 start Google/Facebook sign-in
/// /auth/{provider}/callback                        finish sign-in, redirect to frontend
///
/// /events                                          list (public), create (admin)
/// /events/{id}                                     get (public), update, delete (admin)
/// /events/{id}/register                            book a seat (auth)
///
/// /coaches                                         list (public), create (admin)
/// /coaches/{id}                                    get (public), update, deactivate (admin)
/// /coaches/{id}/slots                              list (public), create (admin)
/// /coaches/{id}/slots/{slot_id}                    delete unbooked slot (admin)
///
/// /bookings                                        my bookings, book (auth)
/// /bookings/{id}                                   get (owner or admin)
/// /bookings/{id}/cancel                            cancel (owner or admin)
///
/// /payments/checkout-session                       open hosted checkout (auth)
/// /payments/session/{session_id}                   reconcile + status (auth)
/// /payments/webhook                                provider webhook (signed)
///
/// /users/me                                        get, update profile (auth)
///
/// /contact                                         submit message (public)
///
/// /admin/dashboard                                 headline counts
/// /admin/users                                     list
/// /admin/users/{id}                                get, update, deactivate
/// /admin/bookings                                  list with filters
/// /admin/bookings/{id}/status                      change status
/// /admin/contact-messages                          list
/// /admin/contact-messages/{id}                     delete
/// /admin/contact-messages/{id}/read                mark read
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/events", events::router())
        .nest("/coaches", coaches::router())
        .nest("/bookings", bookings::router())
        .nest("/payments", payments::router())
        .nest("/users", users::router())
        .nest("/contact", contact::router())
        .nest("/admin", admin::router())
}
