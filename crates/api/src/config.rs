use clubhouse_payments::stripe::StripeConfig;

use crate::auth::jwt::JwtConfig;
use crate::auth::oauth::OAuthConfig;

/// Shortest hold a pending booking gets; matches the provider's minimum
/// checkout session lifetime.
pub const MIN_BOOKING_HOLD_MINUTES: i64 = 30;

/// Added to the hold when setting a checkout's `expires_at`, so the lifetime
/// the provider measures on receipt never drops below its 30-minute floor.
pub const CHECKOUT_EXPIRY_MARGIN_MINUTES: i64 = 1;

/// Longest hold. With the margin added, a checkout still expires within the
/// provider's 24-hour maximum.
pub const MAX_BOOKING_HOLD_MINUTES: i64 = 24 * 60 - CHECKOUT_EXPIRY_MARGIN_MINUTES;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development, except
/// the secrets (`JWT_SECRET`, `STRIPE_*`). In production, override via
/// environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to stop after the server drains (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Public URL of the web frontend, used for checkout and OAuth redirects.
    pub frontend_url: String,
    /// Minutes an unpaid booking holds its seat or slot (default: `30`).
    pub booking_hold_minutes: i64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Stripe credentials.
    pub stripe: StripeConfig,
    /// Google / Facebook sign-in. Providers without credentials are disabled.
    pub oauth: OAuthConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `FRONTEND_URL`         | `http://localhost:5173`    |
    /// | `BOOKING_HOLD_MINUTES` | `30` (`30` to `1439`)      |
    ///
    /// See [`JwtConfig::from_env`], [`StripeConfig::from_env`] and
    /// [`OAuthConfig::from_env`] for the nested sections.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        let booking_hold_minutes =
            parse_booking_hold(std::env::var("BOOKING_HOLD_MINUTES").ok().as_deref());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            frontend_url,
            booking_hold_minutes,
            jwt: JwtConfig::from_env(),
            stripe: StripeConfig::from_env(),
            oauth: OAuthConfig::from_env(),
        }
    }
}

/// Parse `BOOKING_HOLD_MINUTES`. Values above the maximum are clamped.
///
/// # Panics
///
/// Panics if the value is not an integer or is below the minimum.
fn parse_booking_hold(raw: Option<&str>) -> i64 {
    let minutes: i64 = match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .expect("BOOKING_HOLD_MINUTES must be a valid i64"),
        None => MIN_BOOKING_HOLD_MINUTES,
    };
    assert!(
        minutes >= MIN_BOOKING_HOLD_MINUTES,
        "BOOKING_HOLD_MINUTES must be at least {MIN_BOOKING_HOLD_MINUTES}"
    );
    minutes.min(MAX_BOOKING_HOLD_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_hold_defaults_to_minimum() {
        assert_eq!(parse_booking_hold(None), MIN_BOOKING_HOLD_MINUTES);
        assert_eq!(parse_booking_hold(Some(" 45 ")), 45);
    }

    #[test]
    fn booking_hold_is_clamped_to_a_day() {
        assert_eq!(parse_booking_hold(Some("1439")), 1439);
        assert_eq!(parse_booking_hold(Some("1440")), MAX_BOOKING_HOLD_MINUTES);
        assert_eq!(parse_booking_hold(Some("10080")), MAX_BOOKING_HOLD_MINUTES);
        assert!(MAX_BOOKING_HOLD_MINUTES + CHECKOUT_EXPIRY_MARGIN_MINUTES <= 24 * 60);
    }

    #[test]
    #[should_panic(expected = "at least 30")]
    fn booking_hold_below_minimum_panics() {
        parse_booking_hold(Some("10"));
    }
}
