//! The payment provider seam.
//!
//! Handlers depend on `Arc<dyn PaymentProvider>` so tests can swap the
//! Stripe client for an in-memory fake.

use std::collections::BTreeMap;

use async_trait::async_trait;
use clubhouse_core::types::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// Everything needed to open a hosted checkout for one booking.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Charged amount in the currency's minor unit. Always positive.
    pub amount_cents: i64,
    /// Lowercase ISO-4217 code.
    pub currency: String,
    /// Line item label shown on the checkout page.
    pub product_name: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    /// Echoed back on the session and in webhook events.
    pub metadata: BTreeMap<String, String>,
    /// Our own reference, stored as the session's `client_reference_id`.
    pub client_reference_id: String,
    /// When the provider should expire the session if unpaid.
    pub expires_at: Option<Timestamp>,
    /// Repeating a request with the same key returns the original session.
    pub idempotency_key: String,
}

/// A checkout session as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Redirect URL; present while the session is open.
    #[serde(default)]
    pub url: Option<String>,
    /// `open`, `complete`, or `expired`.
    #[serde(default)]
    pub status: Option<String>,
    /// `paid`, `unpaid`, or `no_payment_required`.
    pub payment_status: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Where a checkout session stands from our point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Still open, or completed with an asynchronous payment in flight.
    Pending,
    /// Funds captured.
    Paid,
    /// Expired or failed; the booking should be released.
    Failed,
}

impl CheckoutSession {
    /// Classify the session by its provider-reported status.
    pub fn settlement(&self) -> Settlement {
        match (self.status.as_deref(), self.payment_status.as_str()) {
            (_, "paid") | (Some("complete"), "no_payment_required") => Settlement::Paid,
            (Some("expired"), _) => Settlement::Failed,
            _ => Settlement::Pending,
        }
    }
}

/// A hosted-checkout payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Provider name stored alongside each payment (e.g. `"stripe"`).
    fn name(&self) -> &'static str;

    /// Open a checkout session and return it with its redirect URL.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Fetch the current state of a checkout session.
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Close an open checkout session so it can no longer be paid.
    ///
    /// Fails if the session already completed or expired.
    async fn expire_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError>;
}
