//! Price computation and currency validation.
//!
//! All amounts are integers in the currency's minor unit (cents), matching
//! what the payment provider expects.

use crate::error::CoreError;
use crate::types::Timestamp;

/// Currency used when an event or coach does not specify one.
pub const DEFAULT_CURRENCY: &str = "eur";

/// Upper bound for a single booking amount (100 000.00 in major units).
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000;

/// Price of a coach session of the given length at `hourly_rate_cents`.
///
/// Partial hours are charged pro rata, rounded up to the next minor unit.
pub fn coach_session_price(
    hourly_rate_cents: i64,
    starts_at: Timestamp,
    ends_at: Timestamp,
) -> Result<i64, CoreError> {
    validate_amount(hourly_rate_cents)?;
    let minutes = (ends_at - starts_at).num_minutes();
    if minutes <= 0 {
        return Err(CoreError::Validation(
            "Session must end after it starts".into(),
        ));
    }
    let total = hourly_rate_cents * minutes;
    Ok((total + 59) / 60)
}

/// Validate a non-negative amount within [`MAX_AMOUNT_CENTS`].
pub fn validate_amount(amount_cents: i64) -> Result<(), CoreError> {
    if amount_cents < 0 {
        return Err(CoreError::Validation("Amount must not be negative".into()));
    }
    if amount_cents > MAX_AMOUNT_CENTS {
        return Err(CoreError::Validation(format!(
            "Amount exceeds maximum of {MAX_AMOUNT_CENTS} minor units"
        )));
    }
    Ok(())
}

/// Validate and normalize an ISO-4217 currency code to lowercase.
pub fn normalize_currency(currency: &str) -> Result<String, CoreError> {
    let code = currency.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::Validation(format!(
            "Invalid currency code '{currency}'. Expected a 3-letter ISO code"
        )));
    }
    Ok(code.to_ascii_lowercase())
}

/// Human-readable amount, e.g. `"25.00 EUR"`.
pub fn format_amount(amount_cents: i64, currency: &str) -> String {
    format!(
        "{}.{:02} {}",
        amount_cents / 100,
        amount_cents % 100,
        currency.to_ascii_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn at(hour: u32, min: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, min, 0).unwrap()
    }

    #[test]
    fn full_hour_is_hourly_rate() {
        assert_eq!(coach_session_price(6000, at(10, 0), at(11, 0)).unwrap(), 6000);
    }

    #[test]
    fn partial_hour_rounds_up() {
        // 45 minutes at 33.33/h = 2499.75 -> 2500
        assert_eq!(coach_session_price(3333, at(10, 0), at(10, 45)).unwrap(), 2500);
    }

    #[test]
    fn zero_length_session_is_rejected() {
        assert!(coach_session_price(6000, at(10, 0), at(10, 0)).is_err());
        assert!(coach_session_price(6000, at(11, 0), at(10, 0)).is_err());
    }

    #[test]
    fn negative_rate_is_rejected() {
        let start = at(10, 0);
        assert!(coach_session_price(-1, start, start + Duration::hours(1)).is_err());
    }

    #[test]
    fn currency_is_lowercased() {
        assert_eq!(normalize_currency(" EUR ").unwrap(), "eur");
        assert!(normalize_currency("euro").is_err());
        assert!(normalize_currency("e1r").is_err());
    }

    #[test]
    fn amounts_format_with_two_decimals() {
        assert_eq!(format_amount(2505, "eur"), "25.05 EUR");
        assert_eq!(format_amount(0, "usd"), "0.00 USD");
    }

    #[test]
    fn amount_bounds() {
        assert!(validate_amount(0).is_ok());
        assert!(validate_amount(MAX_AMOUNT_CENTS).is_ok());
        assert!(validate_amount(MAX_AMOUNT_CENTS + 1).is_err());
    }
}
