//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{auth, oauth};
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /register               -> register
/// POST /login                  -> login
/// POST /refresh                -> refresh
/// POST /logout                 -> logout (requires auth)
/// GET  /me                     -> me (requires auth)
/// GET  /{provider}             -> oauth::start
/// GET  /{provider}/callback    -> oauth::callback
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/{provider}", get(oauth::start))
        .route("/{provider}/callback", get(oauth::callback))
}
