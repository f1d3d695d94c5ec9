//! Route definitions for the `/payments` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::payments;
use crate::state::AppState;

/// Routes mounted at `/payments`.
///
/// ```text
/// POST /checkout-session          -> create_checkout_session (auth)
/// GET  /session/{session_id}      -> session_status (auth)
/// POST /webhook                   -> webhook (signature-verified, no auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout-session", post(payments::create_checkout_session))
        .route("/session/{session_id}", get(payments::session_status))
        .route("/webhook", post(payments::webhook))
}
