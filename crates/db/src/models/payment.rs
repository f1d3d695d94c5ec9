//! Checkout payment model and DTOs.

use clubhouse_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Provider name stored on every payment created through Stripe Checkout.
pub const PROVIDER_STRIPE: &str = "stripe";

/// A payment row from the `payments` table. One row per checkout session.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: DbId,
    pub booking_id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub provider_session_id: String,
    pub payment_intent_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub checkout_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a freshly created checkout session.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub booking_id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub provider_session_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub checkout_url: Option<String>,
}

/// Final state of a checkout session as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Funds were captured.
    Paid { payment_intent_id: Option<String> },
    /// The session expired or the asynchronous payment failed.
    Failed,
}
