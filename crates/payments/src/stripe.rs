//! Stripe Checkout over the Stripe HTTP API.
//!
//! Requests are form-encoded with bearer authentication. Session creation
//! carries an `Idempotency-Key` so a retried checkout for the same booking
//! returns the session Stripe already created.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PaymentError;
use crate::provider::{CheckoutSession, CheckoutSessionRequest, PaymentProvider};

/// Production API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Accepted clock skew for webhook signatures, in seconds.
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// HTTP request timeout for a single API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Stripe credentials and endpoints.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`).
    pub secret_key: String,
    /// Signing secret of the webhook endpoint (`whsec_...`).
    pub webhook_secret: String,
    /// API base URL, overridable for stubs.
    pub api_base: String,
    /// Maximum webhook timestamp age in seconds.
    pub webhook_tolerance_secs: i64,
}

impl StripeConfig {
    /// Load Stripe configuration from environment variables.
    ///
    /// | Env Var                        | Required | Default                  |
    /// |--------------------------------|----------|--------------------------|
    /// | `STRIPE_SECRET_KEY`            | **yes**  | --                       |
    /// | `STRIPE_WEBHOOK_SECRET`        | **yes**  | --                       |
    /// | `STRIPE_API_BASE`              | no       | `https://api.stripe.com` |
    /// | `STRIPE_WEBHOOK_TOLERANCE_SECS`| no       | `300`                    |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or empty, or the tolerance
    /// is not a valid integer.
    pub fn from_env() -> Self {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .expect("STRIPE_SECRET_KEY must be set in the environment");
        assert!(!secret_key.is_empty(), "STRIPE_SECRET_KEY must not be empty");

        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .expect("STRIPE_WEBHOOK_SECRET must be set in the environment");
        assert!(
            !webhook_secret.is_empty(),
            "STRIPE_WEBHOOK_SECRET must not be empty"
        );

        let api_base = std::env::var("STRIPE_API_BASE")
            .unwrap_or_else(|_| DEFAULT_API_BASE.into())
            .trim_end_matches('/')
            .to_string();

        let webhook_tolerance_secs: i64 = std::env::var("STRIPE_WEBHOOK_TOLERANCE_SECS")
            .unwrap_or_else(|_| DEFAULT_WEBHOOK_TOLERANCE_SECS.to_string())
            .parse()
            .expect("STRIPE_WEBHOOK_TOLERANCE_SECS must be a valid i64");

        Self {
            secret_key,
            webhook_secret,
            api_base,
            webhook_tolerance_secs,
        }
    }
}

/// Error envelope returned by the Stripe API on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for Stripe Checkout.
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    /// Create a client with a pre-configured HTTP connection pool.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.clone(),
        })
    }

    /// Ensure the response has a success status code, then decode it.
    async fn parse_response(response: reqwest::Response) -> Result<CheckoutSession, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

/// Flatten a checkout request into Stripe's bracketed form parameters.
pub fn checkout_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        (
            "client_reference_id".to_string(),
            request.client_reference_id.clone(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.amount_cents.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.product_name.clone(),
        ),
    ];
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    if let Some(expires_at) = request.expires_at {
        form.push(("expires_at".to_string(), expires_at.timestamp().to_string()));
    }
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
    }
    form
}

#[async_trait]
impl PaymentProvider for StripeClient {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&checkout_form(request))
            .send()
            .await?;

        let session = Self::parse_response(response).await?;
        tracing::debug!(session_id = %session.id, "Stripe checkout session created");
        Ok(session)
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .client
            .get(format!("{}/v1/checkout/sessions/{session_id}", self.api_base))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn expire_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .client
            .post(format!(
                "{}/v1/checkout/sessions/{session_id}/expire",
                self.api_base
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let session = Self::parse_response(response).await?;
        tracing::debug!(session_id = %session.id, "Stripe checkout session expired");
        Ok(session)
    }
}
