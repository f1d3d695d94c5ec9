//! Handlers for the `/payments` resource: hosted checkout, status
//! reconciliation, and the provider webhook.
//!
//! The amount charged always comes from the booking's price snapshot. The
//! booking is settled by whichever arrives first: the signed webhook or a
//! status poll that finds the session settled at the provider. Both paths go
//! through [`PaymentRepo::apply_outcome`], which is idempotent.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Duration, Utc};
use clubhouse_core::booking::{
    can_checkout, KIND_EVENT, PAYMENT_PAID, PAYMENT_PENDING, STATUS_CANCELLED,
};
use clubhouse_core::pricing::format_amount;
use clubhouse_core::types::{DbId, Timestamp};
use clubhouse_db::models::booking::{Booking, BookingDetail};
use clubhouse_db::models::payment::{CreatePayment, Payment, SessionOutcome};
use clubhouse_db::repositories::{BookingRepo, PaymentRepo, WebhookEventRepo};
use clubhouse_payments::webhook::{verify_signature, WebhookEvent, SIGNATURE_HEADER};
use clubhouse_payments::{CheckoutSession, CheckoutSessionRequest, PaymentError, Settlement};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgConnection;

use crate::config::CHECKOUT_EXPIRY_MARGIN_MINUTES;
use crate::error::{AppError, AppResult};
use crate::handlers::bookings::not_found as booking_not_found;
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /payments/checkout-session`.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub booking_id: DbId,
    /// Must point at the frontend; defaults to `{FRONTEND_URL}/payment/success`.
    pub success_url: Option<String>,
    /// Must point at the frontend; defaults to `{FRONTEND_URL}/payment/cancel`.
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub booking_id: DbId,
    pub payment_id: DbId,
    pub session_id: String,
    /// Where to send the browser.
    pub url: String,
    pub amount_cents: i64,
    pub currency: String,
}

impl CheckoutResponse {
    fn from_payment(payment: &Payment, url: String) -> Self {
        Self {
            booking_id: payment.booking_id,
            payment_id: payment.id,
            session_id: payment.provider_session_id.clone(),
            url,
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub payment_status: String,
    pub booking: Booking,
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

/// POST /api/v1/payments/checkout-session
///
/// Open a hosted checkout for a pending booking. While a checkout for the
/// booking is still open, the same session is returned.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<CheckoutRequest>,
) -> AppResult<Json<DataResponse<CheckoutResponse>>> {
    let detail = BookingRepo::find_detail(&state.pool, input.booking_id)
        .await?
        .ok_or_else(|| booking_not_found(input.booking_id))?;
    user.ensure_owner_or_admin(detail.booking.user_id)?;
    let booking = &detail.booking;
    can_checkout(&booking.status, &booking.payment_status, booking.amount_cents)?;

    if let Some(open) = PaymentRepo::find_open_for_booking(&state.pool, booking.id).await? {
        if let Some(url) = open.checkout_url.clone() {
            tracing::debug!(booking_id = booking.id, payment_id = open.id, "Reusing open checkout");
            return Ok(Json(DataResponse {
                data: CheckoutResponse::from_payment(&open, url),
            }));
        }
    }

    let frontend = &state.config.frontend_url;
    let success_url = return_url(
        frontend,
        input.success_url,
        format!("{frontend}/payment/success?session_id={{CHECKOUT_SESSION_ID}}"),
    )?;
    let cancel_url = return_url(
        frontend,
        input.cancel_url,
        format!("{frontend}/payment/cancel?booking_id={}", booking.id),
    )?;

    let attempts = PaymentRepo::list_for_booking(&state.pool, booking.id).await?.len();
    let request = CheckoutSessionRequest {
        amount_cents: booking.amount_cents,
        currency: booking.currency.clone(),
        product_name: detail.item_title.clone(),
        customer_email: Some(detail.user_email.clone()),
        success_url,
        cancel_url,
        metadata: checkout_metadata(&detail),
        client_reference_id: booking.id.to_string(),
        expires_at: Some(checkout_expires_at(Utc::now(), state.config.booking_hold_minutes)),
        idempotency_key: format!("checkout-booking-{}-{attempts}", booking.id),
    };

    let session = state.payments.create_checkout_session(&request).await?;
    let url = session.url.clone().ok_or_else(|| {
        AppError::Payment(PaymentError::InvalidResponse(
            "Checkout session has no redirect URL".into(),
        ))
    })?;

    // A retried request may hand back a session we already stored.
    let provider = state.payments.name();
    let payment = match PaymentRepo::find_by_session_id(&state.pool, provider, &session.id).await? {
        Some(existing) => existing,
        None => {
            PaymentRepo::create(
                &state.pool,
                &CreatePayment {
                    booking_id: booking.id,
                    user_id: booking.user_id,
                    provider: provider.to_string(),
                    provider_session_id: session.id.clone(),
                    amount_cents: booking.amount_cents,
                    currency: booking.currency.clone(),
                    checkout_url: Some(url.clone()),
                },
            )
            .await?
        }
    };

    tracing::info!(
        booking_id = booking.id,
        payment_id = payment.id,
        session_id = %session.id,
        amount = %format_amount(booking.amount_cents, &booking.currency),
        "Checkout session created"
    );
    Ok(Json(DataResponse {
        data: CheckoutResponse::from_payment(&payment, url),
    }))
}

/// GET /api/v1/payments/session/{session_id}
///
/// Report the payment state of a checkout. A payment still pending locally
/// is checked against the provider and settled if the provider has settled
/// it, which covers a lost or delayed webhook.
pub async fn session_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(session_id): Path<String>,
) -> AppResult<Json<DataResponse<SessionStatusResponse>>> {
    let provider = state.payments.name();
    let mut payment = PaymentRepo::find_by_session_id(&state.pool, provider, &session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Checkout session {session_id} not found")))?;
    user.ensure_owner_or_admin(payment.user_id)?;

    let mut booking = None;
    if payment.status == PAYMENT_PENDING {
        let session = state.payments.retrieve_checkout_session(&session_id).await?;
        if let Some(outcome) = outcome_for(session.settlement(), &session) {
            let mut tx = state.pool.begin().await?;
            if let Some((updated, settled)) =
                apply_outcome(&mut *tx, provider, &session_id, &outcome).await?
            {
                payment = updated;
                booking = Some(settled);
            }
            tx.commit().await?;
            tracing::info!(session_id = %session_id, status = %payment.status, "Checkout reconciled");
        }
    }

    let booking = match booking {
        Some(booking) => booking,
        None => BookingRepo::find_by_id(&state.pool, payment.booking_id)
            .await?
            .ok_or_else(|| booking_not_found(payment.booking_id))?,
    };

    Ok(Json(DataResponse {
        data: SessionStatusResponse {
            session_id,
            payment_status: payment.status,
            booking,
        },
    }))
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// POST /api/v1/payments/webhook
///
/// Receives the raw body so the signature can be checked over the exact
/// bytes sent. Each provider event is applied once: the event ID is claimed
/// in the same transaction that settles the booking, so a redelivery after
/// a failure is processed again and a redelivery after success is a no-op.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing webhook signature".into()))?;

    let stripe = &state.config.stripe;
    verify_signature(
        &body,
        signature,
        &stripe.webhook_secret,
        stripe.webhook_tolerance_secs,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Rejected webhook signature");
        AppError::BadRequest(format!("Invalid webhook signature: {e}"))
    })?;

    let event = WebhookEvent::parse(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed webhook payload: {e}")))?;
    let update = event
        .checkout_update()
        .map_err(|e| AppError::BadRequest(format!("Malformed checkout session: {e}")))?;

    let mut tx = state.pool.begin().await?;
    if !WebhookEventRepo::record(&mut *tx, &event.id, &event.event_type).await? {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Duplicate webhook ignored");
        return Ok(Json(json!({ "received": true, "duplicate": true })));
    }

    match update {
        Some(update) => match outcome_for(update.settlement, &update.session) {
            Some(outcome) => {
                let applied =
                    apply_outcome(&mut *tx, state.payments.name(), &update.session.id, &outcome)
                        .await?;
                if applied.is_none() {
                    tracing::warn!(
                        event_id = %event.id,
                        session_id = %update.session.id,
                        "Webhook for unknown checkout session"
                    );
                }
            }
            None => tracing::debug!(
                event_id = %event.id,
                session_id = %update.session.id,
                "Checkout completed, payment still processing"
            ),
        },
        None => tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Webhook event ignored"),
    }

    tx.commit().await?;
    Ok(Json(json!({ "received": true })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn outcome_for(settlement: Settlement, session: &CheckoutSession) -> Option<SessionOutcome> {
    match settlement {
        Settlement::Paid => Some(SessionOutcome::Paid {
            payment_intent_id: session.payment_intent.clone(),
        }),
        Settlement::Failed => Some(SessionOutcome::Failed),
        Settlement::Pending => None,
    }
}

/// Settle the payment and booking for `session_id` and log the result.
async fn apply_outcome(
    conn: &mut PgConnection,
    provider: &str,
    session_id: &str,
    outcome: &SessionOutcome,
) -> AppResult<Option<(Payment, Booking)>> {
    let applied = PaymentRepo::apply_outcome(conn, provider, session_id, outcome).await?;
    if let Some((payment, booking)) = &applied {
        if booking.status == STATUS_CANCELLED && booking.payment_status == PAYMENT_PAID {
            tracing::warn!(
                booking_id = booking.id,
                payment_id = payment.id,
                "Payment captured for a cancelled booking; refund due"
            );
        } else {
            tracing::info!(
                booking_id = booking.id,
                payment_id = payment.id,
                status = %booking.status,
                payment_status = %booking.payment_status,
                "Checkout settled"
            );
        }
    }
    Ok(applied)
}

/// Expire the provider sessions of checkouts closed by a cancellation.
///
/// The booking change is already committed, so failures are logged rather
/// than returned. A session the provider refuses to expire may have been
/// paid in the meantime; it is fetched and settled, which records the
/// payment as a refund due.
pub(crate) async fn expire_closed_checkouts(state: &AppState, closed: &[Payment]) {
    for payment in closed {
        let session_id = payment.provider_session_id.as_str();
        match state.payments.expire_checkout_session(session_id).await {
            Ok(_) => tracing::info!(
                payment_id = payment.id,
                session_id = %session_id,
                "Checkout session expired"
            ),
            Err(e) => {
                tracing::warn!(
                    payment_id = payment.id,
                    session_id = %session_id,
                    error = %e,
                    "Could not expire checkout session"
                );
                if let Err(e) = settle_from_provider(state, session_id).await {
                    tracing::error!(session_id = %session_id, error = %e, "Checkout reconciliation failed");
                }
            }
        }
    }
}

async fn settle_from_provider(state: &AppState, session_id: &str) -> AppResult<()> {
    let session = state.payments.retrieve_checkout_session(session_id).await?;
    if let Some(outcome) = outcome_for(session.settlement(), &session) {
        let mut tx = state.pool.begin().await?;
        apply_outcome(&mut *tx, state.payments.name(), session_id, &outcome).await?;
        tx.commit().await?;
    }
    Ok(())
}

/// When the provider should expire a checkout opened at `now`.
fn checkout_expires_at(now: Timestamp, hold_minutes: i64) -> Timestamp {
    now + Duration::minutes(hold_minutes + CHECKOUT_EXPIRY_MARGIN_MINUTES)
}

/// Use a caller-supplied return URL only when it points at the frontend.
fn return_url(frontend: &str, requested: Option<String>, default: String) -> AppResult<String> {
    match requested {
        None => Ok(default),
        Some(url) if url == frontend || url.starts_with(&format!("{frontend}/")) => Ok(url),
        Some(_) => Err(AppError::BadRequest(
            "Return URLs must point at the club website".into(),
        )),
    }
}

fn checkout_metadata(detail: &BookingDetail) -> BTreeMap<String, String> {
    let booking = &detail.booking;
    let mut metadata = BTreeMap::from([
        ("booking_id".to_string(), booking.id.to_string()),
        ("kind".to_string(), booking.kind.clone()),
        ("user_id".to_string(), booking.user_id.to_string()),
    ]);
    if booking.kind == KIND_EVENT {
        if let Some(event_id) = booking.event_id {
            metadata.insert("event_id".to_string(), event_id.to_string());
        }
    } else if let Some(coach_id) = detail.coach_id {
        metadata.insert("coach_id".to_string(), coach_id.to_string());
    }
    metadata
}
