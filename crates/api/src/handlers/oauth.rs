//! Handlers for Google / Facebook sign-in.
//!
//! `GET /auth/{provider}` sends the browser to the provider's consent screen;
//! `GET /auth/{provider}/callback` completes the flow and sends the browser
//! back to the frontend with an access token in the query string. The
//! callback never answers with JSON: every failure becomes a redirect to the
//! frontend login page.
//!
//! `start` also sets the state nonce as an HttpOnly cookie; `callback`
//! requires it and clears it whatever the outcome.

use axum::extract::{Path, Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName};
use axum::response::Redirect;
use clubhouse_core::error::CoreError;
use clubhouse_core::roles::DEFAULT_ROLE_ID;
use clubhouse_core::text::{normalize_email, normalize_name, normalize_provider, validate_email};
use clubhouse_db::models::user::{CreateUser, User};
use clubhouse_db::repositories::{RoleRepo, UserRepo};
use reqwest::Url;
use serde::Deserialize;

use crate::auth::jwt::generate_access_token;
use crate::auth::oauth::{
    authorize_url, clear_state_cookie, issue_state, state_cookie, verify_state, OAuthProfile,
    STATE_COOKIE,
};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Query string the provider appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user declined consent.
    pub error: Option<String>,
}

/// Response headers carrying one `Set-Cookie`.
type WithCookie = [(HeaderName, String); 1];

/// GET /api/v1/auth/{provider}
pub async fn start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> AppResult<(WithCookie, Redirect)> {
    let provider = normalize_provider(&provider);
    let config = state
        .config
        .oauth
        .provider(&provider)
        .ok_or_else(|| AppError::BadRequest(format!("Sign-in with '{provider}' is not available")))?;

    let issued = issue_state(&provider, &state.config.jwt.secret)
        .map_err(|e| AppError::InternalError(format!("State token error: {e}")))?;
    let url = authorize_url(&provider, config, &issued.token)
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let cookie = state_cookie(&issued.nonce, secure_cookie(&state, &provider));
    Ok(([(SET_COOKIE, cookie)], Redirect::to(&url)))
}

/// GET /api/v1/auth/{provider}/callback
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> (WithCookie, Redirect) {
    let provider = normalize_provider(&provider);
    let frontend = &state.config.frontend_url;
    let nonce = cookie_value(&headers, STATE_COOKIE);

    let redirect = complete_sign_in(&state, &provider, nonce, params)
        .await
        .and_then(|token| {
            Url::parse_with_params(
                &format!("{frontend}/auth/callback"),
                &[("token", token.as_str())],
            )
            .map(String::from)
            .map_err(|e| AppError::InternalError(format!("Invalid FRONTEND_URL: {e}")))
        });

    let clear = [(SET_COOKIE, clear_state_cookie(secure_cookie(&state, &provider)))];
    match redirect {
        Ok(url) => (clear, Redirect::to(&url)),
        Err(e) => {
            tracing::warn!(provider = %provider, error = %e, "OAuth sign-in failed");
            (clear, Redirect::to(&format!("{frontend}/login?error=oauth_failed")))
        }
    }
}

/// The callback is served over HTTPS when the registered redirect URI is.
fn secure_cookie(state: &AppState, provider: &str) -> bool {
    state
        .config
        .oauth
        .provider(provider)
        .is_some_and(|c| c.redirect_uri.starts_with("https://"))
}

/// Value of the cookie `name` from the request's `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

/// Verify the callback, exchange the code, and return a signed access token.
async fn complete_sign_in(
    state: &AppState,
    provider: &str,
    cookie_nonce: Option<&str>,
    params: CallbackParams,
) -> AppResult<String> {
    if let Some(error) = params.error {
        return Err(AppError::BadRequest(format!("Provider returned '{error}'")));
    }
    let config = state
        .config
        .oauth
        .provider(provider)
        .ok_or_else(|| AppError::BadRequest(format!("Sign-in with '{provider}' is not available")))?;

    let oauth_state = params
        .state
        .ok_or_else(|| AppError::BadRequest("Missing state parameter".into()))?;
    verify_state(&oauth_state, provider, cookie_nonce, &state.config.jwt.secret)
        .map_err(|e| AppError::Core(CoreError::Unauthorized(e.to_string())))?;

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing code parameter".into()))?;
    let profile = state
        .oauth
        .exchange(provider, config, &code)
        .await
        .map_err(|e| AppError::Core(CoreError::Unauthorized(e.to_string())))?;

    let user = find_or_create_user(state, provider, &profile).await?;
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;

    tracing::info!(user_id = user.id, provider = %provider, "OAuth sign-in");

    generate_access_token(user.id, &role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))
}

/// Resolve the account for a provider identity.
///
/// Lookup order: the linked provider identity, then the email address,
/// linking the identity to that account when the provider has verified the
/// address. Unknown identities get a new member account without a password.
async fn find_or_create_user(
    state: &AppState,
    provider: &str,
    profile: &OAuthProfile,
) -> AppResult<User> {
    if let Some(user) =
        UserRepo::find_by_provider_identity(&state.pool, provider, &profile.provider_user_id)
            .await?
    {
        return Ok(user);
    }

    let email = normalize_email(&profile.email);
    validate_email(&email)?;

    if let Some(existing) = UserRepo::find_by_email(&state.pool, &email).await? {
        if !profile.email_verified {
            return Err(AppError::Core(CoreError::Conflict(format!(
                "An account for this email already exists; {provider} did not verify the address"
            ))));
        }
        let linked = UserRepo::link_provider_identity(
            &state.pool,
            existing.id,
            provider,
            &profile.provider_user_id,
            profile.avatar_url.as_deref(),
        )
        .await?;
        // Already linked to another provider: the email match still identifies the member.
        return Ok(linked.unwrap_or(existing));
    }

    let full_name = profile
        .full_name
        .as_deref()
        .map(normalize_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email,
            password_hash: None,
            full_name,
            phone: None,
            avatar_url: profile.avatar_url.clone(),
            role_id: DEFAULT_ROLE_ID,
            auth_provider: provider.to_string(),
            provider_user_id: Some(profile.provider_user_id.clone()),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, provider = %provider, "Member created from OAuth profile");
    Ok(user)
}
