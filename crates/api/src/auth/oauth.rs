//! Google and Facebook sign-in over the OAuth 2.0 authorization-code flow.
//!
//! The `state` parameter is a short-lived HS256 token signed with the JWT
//! secret. It names the provider it was issued for and carries a nonce that
//! is also set as an HttpOnly cookie on the browser that started the flow.
//! A callback is accepted only when the two match, so a state minted in one
//! browser cannot complete a sign-in in another.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{self, random_token};

pub const PROVIDER_GOOGLE: &str = "google";
pub const PROVIDER_FACEBOOK: &str = "facebook";

/// Lifetime of an issued `state` token.
pub const STATE_TTL_SECS: i64 = 600;

/// Cookie holding the nonce of the sign-in this browser started.
pub const STATE_COOKIE: &str = "clubhouse_oauth_state";

const STATE_COOKIE_PATH: &str = "/api/v1/auth";
const STATE_AUDIENCE: &str = "oauth-state";
const NONCE_LENGTH: usize = 24;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const FACEBOOK_AUTHORIZE_URL: &str = "https://www.facebook.com/v19.0/dialog/oauth";
const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/v19.0/oauth/access_token";
const FACEBOOK_PROFILE_URL: &str = "https://graph.facebook.com/v19.0/me";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Client credentials registered with one provider.
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with the provider.
    pub redirect_uri: String,
}

/// Sign-in providers. A provider without credentials is disabled.
#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
    pub google: Option<OAuthProviderConfig>,
    pub facebook: Option<OAuthProviderConfig>,
}

impl OAuthConfig {
    /// Load provider credentials from environment variables.
    ///
    /// | Env Var                   | Default                                        |
    /// |---------------------------|------------------------------------------------|
    /// | `GOOGLE_CLIENT_ID`        | unset (Google disabled)                        |
    /// | `GOOGLE_CLIENT_SECRET`    | unset (Google disabled)                        |
    /// | `GOOGLE_REDIRECT_URI`     | `{PUBLIC_API_URL}/api/v1/auth/google/callback` |
    /// | `FACEBOOK_CLIENT_ID`      | unset (Facebook disabled)                      |
    /// | `FACEBOOK_CLIENT_SECRET`  | unset (Facebook disabled)                      |
    /// | `FACEBOOK_REDIRECT_URI`   | `{PUBLIC_API_URL}/api/v1/auth/facebook/callback` |
    /// | `PUBLIC_API_URL`          | `http://localhost:3000`                        |
    pub fn from_env() -> Self {
        let public_api_url = std::env::var("PUBLIC_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        Self {
            google: provider_from_env("GOOGLE", PROVIDER_GOOGLE, &public_api_url),
            facebook: provider_from_env("FACEBOOK", PROVIDER_FACEBOOK, &public_api_url),
        }
    }

    /// Credentials for a provider name, if that provider is enabled.
    pub fn provider(&self, name: &str) -> Option<&OAuthProviderConfig> {
        match name {
            PROVIDER_GOOGLE => self.google.as_ref(),
            PROVIDER_FACEBOOK => self.facebook.as_ref(),
            _ => None,
        }
    }
}

fn provider_from_env(
    prefix: &str,
    name: &str,
    public_api_url: &str,
) -> Option<OAuthProviderConfig> {
    let non_empty = |key: String| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

    let client_id = non_empty(format!("{prefix}_CLIENT_ID"))?;
    let client_secret = non_empty(format!("{prefix}_CLIENT_SECRET"))?;
    let redirect_uri = non_empty(format!("{prefix}_REDIRECT_URI"))
        .unwrap_or_else(|| format!("{public_api_url}/api/v1/auth/{name}/callback"));

    Some(OAuthProviderConfig {
        client_id,
        client_secret,
        redirect_uri,
    })
}

// ---------------------------------------------------------------------------
// Errors and profile
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Unknown or disabled OAuth provider '{0}'")]
    UnknownProvider(String),

    #[error("Invalid or expired OAuth state")]
    InvalidState,

    #[error("OAuth request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OAuth provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("OAuth provider did not return an email address")]
    MissingEmail,

    #[error("OAuth provider reports the email address as unverified")]
    UnverifiedEmail,

    #[error("Malformed OAuth URL: {0}")]
    InvalidUrl(String),
}

/// The identity a provider vouches for after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider_user_id: String,
    pub email: String,
    /// The provider asserts the member controls `email`. Only then may the
    /// identity be attached to an existing account with that address.
    pub email_verified: bool,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Authorization redirect and state
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    nonce: String,
    provider: String,
    aud: String,
    exp: i64,
    iat: i64,
}

/// A freshly issued `state` and the nonce its browser must present in
/// [`STATE_COOKIE`] when the provider sends it back.
#[derive(Debug, Clone)]
pub struct IssuedState {
    pub token: String,
    pub nonce: String,
}

/// Issue a signed `state` value for a sign-in started with `provider`.
pub fn issue_state(
    provider: &str,
    secret: &str,
) -> Result<IssuedState, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let nonce = random_token(NONCE_LENGTH);
    let claims = StateClaims {
        nonce: nonce.clone(),
        provider: provider.to_string(),
        aud: STATE_AUDIENCE.to_string(),
        exp: now + STATE_TTL_SECS,
        iat: now,
    };
    Ok(IssuedState {
        token: jwt::sign(&claims, secret)?,
        nonce,
    })
}

/// Check that `state` was issued by us, for `provider`, has not expired, and
/// belongs to the browser presenting `cookie_nonce`.
pub fn verify_state(
    state: &str,
    provider: &str,
    cookie_nonce: Option<&str>,
    secret: &str,
) -> Result<(), OAuthError> {
    let claims: StateClaims =
        jwt::verify(state, secret, STATE_AUDIENCE).map_err(|_| OAuthError::InvalidState)?;
    if claims.provider != provider || cookie_nonce != Some(claims.nonce.as_str()) {
        return Err(OAuthError::InvalidState);
    }
    Ok(())
}

/// `Set-Cookie` value binding a sign-in to the browser that started it.
pub fn state_cookie(nonce: &str, secure: bool) -> String {
    cookie(nonce, STATE_TTL_SECS, secure)
}

/// `Set-Cookie` value removing [`STATE_COOKIE`].
pub fn clear_state_cookie(secure: bool) -> String {
    cookie("", 0, secure)
}

fn cookie(value: &str, max_age: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{STATE_COOKIE}={value}; Path={STATE_COOKIE_PATH}; Max-Age={max_age}; HttpOnly; SameSite=Lax{secure}"
    )
}

/// Build the provider consent-screen URL.
pub fn authorize_url(
    provider: &str,
    config: &OAuthProviderConfig,
    state: &str,
) -> Result<String, OAuthError> {
    let (base, scope) = match provider {
        PROVIDER_GOOGLE => (GOOGLE_AUTHORIZE_URL, "openid email profile"),
        PROVIDER_FACEBOOK => (FACEBOOK_AUTHORIZE_URL, "email,public_profile"),
        other => return Err(OAuthError::UnknownProvider(other.to_string())),
    };
    let url = Url::parse_with_params(
        base,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scope),
            ("state", state),
        ],
    )
    .map_err(|e| OAuthError::InvalidUrl(e.to_string()))?;
    Ok(url.into())
}

// ---------------------------------------------------------------------------
// Code exchange
// ---------------------------------------------------------------------------

/// Exchanges an authorization code for the signed-in user's profile.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    async fn exchange(
        &self,
        provider: &str,
        config: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile, OAuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<FacebookPicture>,
}

#[derive(Debug, Deserialize)]
struct FacebookPicture {
    data: FacebookPictureData,
}

#[derive(Debug, Deserialize)]
struct FacebookPictureData {
    url: Option<String>,
}

/// [`OAuthClient`] talking to the real provider endpoints.
pub struct HttpOAuthClient {
    client: reqwest::Client,
}

impl HttpOAuthClient {
    pub fn new() -> Result<Self, OAuthError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    async fn google(
        &self,
        config: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile, OAuthError> {
        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let token: TokenResponse = Self::parse_response(response).await?;

        let response = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        let info: GoogleUserInfo = Self::parse_response(response).await?;

        let email = info.email.ok_or(OAuthError::MissingEmail)?;
        if !info.email_verified {
            return Err(OAuthError::UnverifiedEmail);
        }
        Ok(OAuthProfile {
            provider_user_id: info.sub,
            email,
            email_verified: true,
            full_name: info.name,
            avatar_url: info.picture,
        })
    }

    async fn facebook(
        &self,
        config: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile, OAuthError> {
        let response = self
            .client
            .get(FACEBOOK_TOKEN_URL)
            .query(&[
                ("code", code),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = Self::parse_response(response).await?;

        let response = self
            .client
            .get(FACEBOOK_PROFILE_URL)
            .query(&[
                ("fields", "id,name,email,picture.type(large)"),
                ("access_token", token.access_token.as_str()),
            ])
            .send()
            .await?;
        let user: FacebookUser = Self::parse_response(response).await?;

        // The Graph API makes no verification claim about this address.
        let email = user.email.ok_or(OAuthError::MissingEmail)?;
        Ok(OAuthProfile {
            provider_user_id: user.id,
            email,
            email_verified: false,
            full_name: user.name,
            avatar_url: user.picture.and_then(|p| p.data.url),
        })
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, OAuthError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(OAuthError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl OAuthClient for HttpOAuthClient {
    async fn exchange(
        &self,
        provider: &str,
        config: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile, OAuthError> {
        match provider {
            PROVIDER_GOOGLE => self.google(config, code).await,
            PROVIDER_FACEBOOK => self.facebook(config, code).await,
            other => Err(OAuthError::UnknownProvider(other.to_string())),
        }
    }
}
