//! HTTP-level integration tests for hosted checkout, the signed webhook,
//! and status reconciliation. The provider is the in-memory mock.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use clubhouse_db::repositories::{BookingRepo, DashboardRepo, PaymentRepo};
use clubhouse_payments::webhook::{signature_header, SIGNATURE_HEADER};
use common::{
    body_json, create_admin, create_event, create_member, get_auth, post_auth, post_json_auth,
    post_raw, put_json_auth, token_for, MockOAuthClient, MockPaymentProvider, WEBHOOK_SECRET,
};
use sqlx::PgPool;

const WEBHOOK_URI: &str = "/api/v1/payments/webhook";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn app_with(pool: PgPool, mock: &Arc<MockPaymentProvider>) -> axum::Router {
    common::build_app(pool, mock.clone(), Arc::new(MockOAuthClient::default()))
}

/// Register `token`'s user for a paid event and return the booking id.
async fn book_paid_event(app: axum::Router, event_id: i64, token: &str) -> i64 {
    let response = post_auth(app, &format!("/api/v1/events/{event_id}/register"), token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn checkout(app: axum::Router, booking_id: i64, token: &str) -> axum::response::Response {
    post_json_auth(
        app,
        "/api/v1/payments/checkout-session",
        token,
        serde_json::json!({ "booking_id": booking_id }),
    )
    .await
}

fn session_event(
    event_id: &str,
    event_type: &str,
    session_id: &str,
    status: &str,
    payment_status: &str,
) -> Vec<u8> {
    serde_json::json!({
        "id": event_id,
        "type": event_type,
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "status": status,
                "payment_status": payment_status,
                "payment_intent": "pi_webhook",
                "amount_total": 2500,
                "currency": "eur",
            }
        }
    })
    .to_string()
    .into_bytes()
}

async fn deliver(app: axum::Router, payload: Vec<u8>) -> axum::response::Response {
    let header = signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), &payload);
    post_raw(app, WEBHOOK_URI, &[(SIGNATURE_HEADER, header.as_str())], payload).await
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_checkout_uses_booking_price_and_reuses_open_session(pool: PgPool) {
    let member = create_member(&pool, "payer@test.com").await;
    let token = token_for(&member);
    let event_id = create_event(&pool, 10, 2500).await;
    let mock = Arc::new(MockPaymentProvider::default());
    let app = app_with(pool, &mock);

    let booking_id = book_paid_event(app.clone(), event_id, &token).await;

    let response = checkout(app.clone(), booking_id, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["session_id"], "cs_test_1");
    assert_eq!(json["data"]["amount_cents"], 2500);
    assert_eq!(json["data"]["currency"], "eur");
    assert_eq!(json["data"]["url"], "https://checkout.test/pay/cs_test_1");

    let request = mock.last_request().unwrap();
    assert_eq!(request.amount_cents, 2500);
    assert_eq!(request.product_name, "Summer Tournament");
    assert_eq!(request.customer_email.as_deref(), Some("payer@test.com"));
    assert_eq!(request.metadata["booking_id"], booking_id.to_string());
    assert_eq!(request.metadata["event_id"], event_id.to_string());
    assert_eq!(request.idempotency_key, format!("checkout-booking-{booking_id}-0"));
    assert!(request
        .success_url
        .starts_with("http://localhost:5173/payment/success?session_id="));
    assert!(request.expires_at.is_some());

    // A second click while the session is open returns the same checkout.
    let response = checkout(app, booking_id, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["session_id"], "cs_test_1");
    assert_eq!(mock.request_count(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_checkout_rejections(pool: PgPool) {
    let owner = create_member(&pool, "owner@test.com").await;
    let other = create_member(&pool, "other@test.com").await;
    let paid_event = create_event(&pool, 10, 2500).await;
    let free_event = create_event(&pool, 10, 0).await;
    let mock = Arc::new(MockPaymentProvider::default());
    let app = app_with(pool, &mock);
    let token = token_for(&owner);

    let booking_id = book_paid_event(app.clone(), paid_event, &token).await;
    let free_booking = book_paid_event(app.clone(), free_event, &token).await;

    // Someone else's booking.
    let response = checkout(app.clone(), booking_id, &token_for(&other)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Free bookings are already confirmed.
    let response = checkout(app.clone(), free_booking, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Return URLs must stay on the club site.
    let response = post_json_auth(
        app.clone(),
        "/api/v1/payments/checkout-session",
        &token,
        serde_json::json!({ "booking_id": booking_id, "success_url": "https://evil.example/ok" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = checkout(app, 999_999, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(mock.request_count(), 0);
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_confirms_booking_once(pool: PgPool) {
    let member = create_member(&pool, "payer@test.com").await;
    let token = token_for(&member);
    let event_id = create_event(&pool, 10, 2500).await;
    let mock = Arc::new(MockPaymentProvider::default());
    let app = app_with(pool.clone(), &mock);

    let booking_id = book_paid_event(app.clone(), event_id, &token).await;
    checkout(app.clone(), booking_id, &token).await;

    let payload = session_event(
        "evt_paid_1",
        "checkout.session.completed",
        "cs_test_1",
        "complete",
        "paid",
    );
    let response = deliver(app.clone(), payload.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);

    let booking = BookingRepo::find_by_id(&pool, booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, "confirmed");
    assert_eq!(booking.payment_status, "paid");

    let response = deliver(app, payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["duplicate"], true);

    let stats = DashboardRepo::stats(&pool).await.unwrap();
    assert_eq!(stats.revenue_cents, 2500);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_expired_session_releases_booking(pool: PgPool) {
    let member = create_member(&pool, "payer@test.com").await;
    let token = token_for(&member);
    let event_id = create_event(&pool, 10, 2500).await;
    let mock = Arc::new(MockPaymentProvider::default());
    let app = app_with(pool.clone(), &mock);

    let booking_id = book_paid_event(app.clone(), event_id, &token).await;
    checkout(app.clone(), booking_id, &token).await;

    let payload = session_event(
        "evt_expired_1",
        "checkout.session.expired",
        "cs_test_1",
        "expired",
        "unpaid",
    );
    let response = deliver(app, payload).await;
    assert_eq!(response.status(), StatusCode::OK);

    let booking = BookingRepo::find_by_id(&pool, booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, "cancelled");
    assert_eq!(booking.payment_status, "failed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_rejects_bad_or_missing_signature(pool: PgPool) {
    let app = common::build_test_app(pool);
    let payload = session_event(
        "evt_forged",
        "checkout.session.completed",
        "cs_test_1",
        "complete",
        "paid",
    );

    let response = post_raw(app.clone(), WEBHOOK_URI, &[], payload.clone()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let forged = signature_header("whsec_wrong", Utc::now().timestamp(), &payload);
    let response = post_raw(
        app.clone(),
        WEBHOOK_URI,
        &[(SIGNATURE_HEADER, forged.as_str())],
        payload.clone(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Signed a long time ago.
    let stale = signature_header(WEBHOOK_SECRET, Utc::now().timestamp() - 3600, &payload);
    let response = post_raw(app, WEBHOOK_URI, &[(SIGNATURE_HEADER, stale.as_str())], payload).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_ignores_unrelated_events(pool: PgPool) {
    let app = common::build_test_app(pool);
    let payload = serde_json::json!({
        "id": "evt_other",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    })
    .to_string()
    .into_bytes();

    let response = deliver(app, payload).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);
}

/// A payment that lands after the member cancelled is kept and flagged for refund.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_late_payment_on_cancelled_booking_is_refund_due(pool: PgPool) {
    let member = create_member(&pool, "payer@test.com").await;
    let token = token_for(&member);
    let event_id = create_event(&pool, 10, 2500).await;
    let mock = Arc::new(MockPaymentProvider::default());
    let app = app_with(pool.clone(), &mock);

    let booking_id = book_paid_event(app.clone(), event_id, &token).await;
    checkout(app.clone(), booking_id, &token).await;
    let response = post_auth(
        app.clone(),
        &format!("/api/v1/bookings/{booking_id}/cancel"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mock.expired_sessions(), vec!["cs_test_1".to_string()]);

    let payload = session_event(
        "evt_late",
        "checkout.session.completed",
        "cs_test_1",
        "complete",
        "paid",
    );
    deliver(app, payload).await;

    let booking = BookingRepo::find_by_id(&pool, booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, "cancelled");
    assert_eq!(booking.payment_status, "paid");
    assert_eq!(DashboardRepo::stats(&pool).await.unwrap().refunds_due, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cancel_expires_open_checkout(pool: PgPool) {
    let member = create_member(&pool, "payer@test.com").await;
    let token = token_for(&member);
    let event_id = create_event(&pool, 10, 2500).await;
    let mock = Arc::new(MockPaymentProvider::default());
    let app = app_with(pool.clone(), &mock);

    let booking_id = book_paid_event(app.clone(), event_id, &token).await;
    checkout(app.clone(), booking_id, &token).await;

    let response = post_auth(app, &format!("/api/v1/bookings/{booking_id}/cancel"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "cancelled");
    assert_eq!(json["data"]["payment_status"], "failed");

    assert_eq!(mock.expired_sessions(), vec!["cs_test_1".to_string()]);
    let payment = PaymentRepo::find_by_session_id(&pool, "stripe", "cs_test_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, "failed");
    assert!(PaymentRepo::find_open_for_booking(&pool, booking_id)
        .await
        .unwrap()
        .is_none());
}

/// The provider captured the payment before the cancel reached it.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cancel_after_capture_records_refund_due(pool: PgPool) {
    let member = create_member(&pool, "payer@test.com").await;
    let token = token_for(&member);
    let event_id = create_event(&pool, 10, 2500).await;
    let mock = Arc::new(MockPaymentProvider::default());
    let app = app_with(pool.clone(), &mock);

    let booking_id = book_paid_event(app.clone(), event_id, &token).await;
    checkout(app.clone(), booking_id, &token).await;
    mock.settle("complete", "paid");

    let response = post_auth(app, &format!("/api/v1/bookings/{booking_id}/cancel"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "cancelled");
    assert_eq!(json["data"]["payment_status"], "paid");

    let payment = PaymentRepo::find_by_session_id(&pool, "stripe", "cs_test_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, "paid");
    assert_eq!(payment.payment_intent_id.as_deref(), Some("pi_cs_test_1"));
    assert_eq!(DashboardRepo::stats(&pool).await.unwrap().refunds_due, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_cancel_expires_open_checkout(pool: PgPool) {
    let admin = create_admin(&pool, "admin@test.com").await;
    let member = create_member(&pool, "payer@test.com").await;
    let token = token_for(&member);
    let event_id = create_event(&pool, 10, 2500).await;
    let mock = Arc::new(MockPaymentProvider::default());
    let app = app_with(pool.clone(), &mock);

    let booking_id = book_paid_event(app.clone(), event_id, &token).await;
    checkout(app.clone(), booking_id, &token).await;

    let response = put_json_auth(
        app,
        &format!("/api/v1/admin/bookings/{booking_id}/status"),
        &token_for(&admin),
        serde_json::json!({ "status": "cancelled" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(mock.expired_sessions(), vec!["cs_test_1".to_string()]);
    let payment = PaymentRepo::find_by_session_id(&pool, "stripe", "cs_test_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, "failed");
}

// ---------------------------------------------------------------------------
// Status reconciliation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_session_status_reconciles_with_provider(pool: PgPool) {
    let member = create_member(&pool, "payer@test.com").await;
    let token = token_for(&member);
    let event_id = create_event(&pool, 10, 2500).await;
    let mock = Arc::new(MockPaymentProvider::default());
    let app = app_with(pool, &mock);

    let booking_id = book_paid_event(app.clone(), event_id, &token).await;
    checkout(app.clone(), booking_id, &token).await;

    let uri = "/api/v1/payments/session/cs_test_1";
    let response = get_auth(app.clone(), uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["payment_status"], "pending");
    assert_eq!(json["data"]["booking"]["status"], "pending");

    // The webhook never arrived, but the provider has the money.
    mock.settle("complete", "paid");
    let response = get_auth(app, uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["payment_status"], "paid");
    assert_eq!(json["data"]["booking"]["status"], "confirmed");
    assert_eq!(json["data"]["booking"]["payment_status"], "paid");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_session_status_visibility(pool: PgPool) {
    let owner = create_member(&pool, "owner@test.com").await;
    let other = create_member(&pool, "other@test.com").await;
    let admin = create_admin(&pool, "admin@test.com").await;
    let event_id = create_event(&pool, 10, 2500).await;
    let mock = Arc::new(MockPaymentProvider::default());
    let app = app_with(pool, &mock);

    let booking_id = book_paid_event(app.clone(), event_id, &token_for(&owner)).await;
    checkout(app.clone(), booking_id, &token_for(&owner)).await;

    let uri = "/api/v1/payments/session/cs_test_1";
    let response = get_auth(app.clone(), uri, &token_for(&other)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app.clone(), uri, &token_for(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(app, "/api/v1/payments/session/cs_unknown", &token_for(&owner)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
