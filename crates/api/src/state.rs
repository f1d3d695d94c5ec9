use std::sync::Arc;

use clubhouse_payments::PaymentProvider;

use crate::auth::oauth::OAuthClient;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: clubhouse_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Hosted-checkout provider (Stripe in production).
    pub payments: Arc<dyn PaymentProvider>,
    /// OAuth code exchange and profile lookup.
    pub oauth: Arc<dyn OAuthClient>,
}
