#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use clubhouse_api::auth::jwt::{generate_access_token, JwtConfig};
use clubhouse_api::auth::oauth::{
    OAuthClient, OAuthConfig, OAuthError, OAuthProfile, OAuthProviderConfig,
};
use clubhouse_api::auth::password::hash_password;
use clubhouse_api::config::ServerConfig;
use clubhouse_api::routes;
use clubhouse_api::state::AppState;
use clubhouse_core::roles::{DEFAULT_ROLE_ID, ROLE_ADMIN, ROLE_MEMBER};
use clubhouse_db::models::coach::{CreateCoach, CreateCoachSlot};
use clubhouse_db::models::event::CreateEvent;
use clubhouse_db::models::user::{CreateUser, User, PROVIDER_LOCAL};
use clubhouse_db::repositories::{CoachRepo, CoachSlotRepo, EventRepo, UserRepo};
use clubhouse_payments::stripe::StripeConfig;
use clubhouse_payments::{CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentProvider};

pub const FRONTEND_URL: &str = "http://localhost:5173";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_PASSWORD: &str = "correct-horse-battery";
pub const ADMIN_ROLE_ID: i64 = 1;

/// Build a test `ServerConfig` with safe defaults.
///
/// Google sign-in is enabled; Facebook is left unconfigured.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![FRONTEND_URL.to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        frontend_url: FRONTEND_URL.to_string(),
        booking_hold_minutes: 30,
        jwt: JwtConfig {
            secret: "test-jwt-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 60,
            refresh_token_expiry_days: 7,
        },
        stripe: StripeConfig {
            secret_key: "sk_test_unused".to_string(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            webhook_tolerance_secs: 300,
        },
        oauth: OAuthConfig {
            google: Some(OAuthProviderConfig {
                client_id: "google-client".to_string(),
                client_secret: "google-secret".to_string(),
                redirect_uri: "http://localhost:3000/api/v1/auth/google/callback".to_string(),
            }),
            facebook: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// In-memory checkout provider.
///
/// Every created session is `cs_test_<n>`. `retrieve_checkout_session`
/// reports whatever status was last set via [`MockPaymentProvider::settle`].
/// Expiring a session that was settled as paid fails like Stripe does.
#[derive(Default)]
pub struct MockPaymentProvider {
    pub requests: Mutex<Vec<CheckoutSessionRequest>>,
    /// Session ids passed to `expire_checkout_session`, in call order.
    pub expired: Mutex<Vec<String>>,
    counter: AtomicUsize,
    remote_status: Mutex<Option<(String, String)>>,
}

impl MockPaymentProvider {
    /// Make the provider report `(status, payment_status)` for every session.
    pub fn settle(&self, status: &str, payment_status: &str) {
        *self.remote_status.lock().unwrap() =
            Some((status.to_string(), payment_status.to_string()));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CheckoutSessionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn expired_sessions(&self) -> Vec<String> {
        self.expired.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.requests.lock().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{n}");
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.test/pay/{id}")),
            id,
            status: Some("open".to_string()),
            payment_status: "unpaid".to_string(),
            payment_intent: None,
            amount_total: Some(request.amount_cents),
            currency: Some(request.currency.clone()),
            client_reference_id: Some(request.client_reference_id.clone()),
            metadata: request.metadata.clone(),
        })
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let (status, payment_status) = self
            .remote_status
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| ("open".to_string(), "unpaid".to_string()));
        let paid = payment_status == "paid";
        Ok(CheckoutSession {
            id: session_id.to_string(),
            url: None,
            status: Some(status),
            payment_status,
            payment_intent: paid.then(|| format!("pi_{session_id}")),
            amount_total: None,
            currency: None,
            client_reference_id: None,
            metadata: Default::default(),
        })
    }

    async fn expire_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        self.expired.lock().unwrap().push(session_id.to_string());
        let settled = self.remote_status.lock().unwrap().clone();
        if let Some((status, _)) = settled.filter(|(status, _)| status != "open") {
            return Err(PaymentError::Api {
                status: 400,
                message: format!("Only open sessions can be expired; this one is {status}"),
            });
        }
        Ok(CheckoutSession {
            id: session_id.to_string(),
            url: None,
            status: Some("expired".to_string()),
            payment_status: "unpaid".to_string(),
            payment_intent: None,
            amount_total: None,
            currency: None,
            client_reference_id: None,
            metadata: Default::default(),
        })
    }
}

/// OAuth client that accepts the code `"good-code"` and returns `profile`.
pub struct MockOAuthClient {
    pub profile: OAuthProfile,
}

impl Default for MockOAuthClient {
    fn default() -> Self {
        Self {
            profile: OAuthProfile {
                provider_user_id: "google-uid-1".to_string(),
                email: "social@test.com".to_string(),
                email_verified: true,
                full_name: Some("Social Member".to_string()),
                avatar_url: None,
            },
        }
    }
}

#[async_trait]
impl OAuthClient for MockOAuthClient {
    async fn exchange(
        &self,
        _provider: &str,
        _config: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile, OAuthError> {
        if code == "good-code" {
            Ok(self.profile.clone())
        } else {
            Err(OAuthError::Provider {
                status: 400,
                body: "invalid_grant".to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build the full application router with default fakes.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app(
        pool,
        Arc::new(MockPaymentProvider::default()),
        Arc::new(MockOAuthClient::default()),
    )
}

/// Build the full application router with all middleware layers.
///
/// Mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack production uses.
pub fn build_app(
    pool: PgPool,
    payments: Arc<dyn PaymentProvider>,
    oauth: Arc<dyn OAuthClient>,
) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(test_config()),
        payments,
        oauth,
    };

    let cors = CorsLayer::new()
        .allow_origin([FRONTEND_URL.parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Users and tokens
// ---------------------------------------------------------------------------

/// Insert a local account with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, email: &str, role_id: i64) -> User {
    let password_hash = hash_password(TEST_PASSWORD).expect("hashing should succeed");
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash: Some(password_hash),
            full_name: "Test User".to_string(),
            phone: None,
            avatar_url: None,
            role_id,
            auth_provider: PROVIDER_LOCAL.to_string(),
            provider_user_id: None,
        },
    )
    .await
    .expect("user creation should succeed")
}

pub async fn create_member(pool: &PgPool, email: &str) -> User {
    create_user(pool, email, DEFAULT_ROLE_ID).await
}

pub async fn create_admin(pool: &PgPool, email: &str) -> User {
    create_user(pool, email, ADMIN_ROLE_ID).await
}

/// Sign an access token for `user` without going through `/auth/login`.
pub fn token_for(user: &User) -> String {
    let role = if user.role_id == ADMIN_ROLE_ID {
        ROLE_ADMIN
    } else {
        ROLE_MEMBER
    };
    generate_access_token(user.id, role, &test_config().jwt).expect("token should sign")
}

// ---------------------------------------------------------------------------
// Catalog fixtures
// ---------------------------------------------------------------------------

/// Insert a published event a week from now and return its id.
pub async fn create_event(pool: &PgPool, capacity: i32, price_cents: i64) -> i64 {
    let starts_at = Utc::now() + chrono::Duration::days(7);
    EventRepo::create(
        pool,
        &CreateEvent {
            title: "Summer Tournament".to_string(),
            description: Some("Doubles, all levels".to_string()),
            category: Some("tournament".to_string()),
            location: Some("Court 1".to_string()),
            starts_at,
            ends_at: starts_at + chrono::Duration::hours(4),
            capacity,
            price_cents: Some(price_cents),
            currency: None,
            image_url: None,
            is_published: Some(true),
        },
    )
    .await
    .expect("event creation should succeed")
    .id
}

/// Insert a coach with one slot two days from now; returns `(coach_id, slot_id)`.
pub async fn create_coach_with_slot(pool: &PgPool, hourly_rate_cents: i64) -> (i64, i64) {
    let coach = CoachRepo::create(
        pool,
        &CreateCoach {
            name: "Coach Dana".to_string(),
            specialty: Some("tennis".to_string()),
            bio: None,
            hourly_rate_cents,
            currency: None,
            image_url: None,
        },
    )
    .await
    .expect("coach creation should succeed");

    let starts_at = Utc::now() + chrono::Duration::days(2);
    let slot = CoachSlotRepo::create(
        pool,
        coach.id,
        &CreateCoachSlot {
            starts_at,
            ends_at: starts_at + chrono::Duration::hours(1),
        },
    )
    .await
    .expect("slot creation should succeed");
    (coach.id, slot.id)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, empty_request(Method::GET, uri, None)).await
}

/// GET with a `Cookie` header, as a browser returning from a redirect would.
pub async fn get_with_cookie(app: Router, uri: &str, cookie: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(axum::http::header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, empty_request(Method::GET, uri, Some(token))).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, json_request(Method::POST, uri, None, body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, json_request(Method::POST, uri, Some(token), body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, empty_request(Method::POST, uri, Some(token))).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, json_request(Method::PUT, uri, Some(token), body)).await
}

pub async fn put_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, empty_request(Method::PUT, uri, Some(token))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, empty_request(Method::DELETE, uri, Some(token))).await
}

/// POST a raw body with extra headers (used for signed webhooks).
pub async fn post_raw(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: Vec<u8>,
) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    send(app, builder.body(Body::from(body)).unwrap()).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `Location` header of a redirect response.
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}
