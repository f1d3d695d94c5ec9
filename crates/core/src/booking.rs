//! Booking status constants and transition rules.
//!
//! A booking tracks two independent lifecycles: the reservation itself
//! (`pending` -> `confirmed` / `cancelled`) and its payment
//! (`pending` -> `paid` / `failed`). Both are validated here so the API,
//! repository, and webhook paths agree on what is allowed.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Booking kinds
// ---------------------------------------------------------------------------

/// Booking of a seat at a club event.
pub const KIND_EVENT: &str = "event";
/// Booking of a coach time slot.
pub const KIND_COACH: &str = "coach";

pub const VALID_KINDS: &[&str] = &[KIND_EVENT, KIND_COACH];

// ---------------------------------------------------------------------------
// Booking status
// ---------------------------------------------------------------------------

/// Created, awaiting payment or admin confirmation.
pub const STATUS_PENDING: &str = "pending";
/// Paid (or free) and holding its seat / slot.
pub const STATUS_CONFIRMED: &str = "confirmed";
/// Released. Terminal.
pub const STATUS_CANCELLED: &str = "cancelled";

pub const VALID_STATUSES: &[&str] = &[STATUS_PENDING, STATUS_CONFIRMED, STATUS_CANCELLED];

// ---------------------------------------------------------------------------
// Payment status
// ---------------------------------------------------------------------------

pub const PAYMENT_PENDING: &str = "pending";
pub const PAYMENT_PAID: &str = "paid";
pub const PAYMENT_FAILED: &str = "failed";

pub const VALID_PAYMENT_STATUSES: &[&str] = &[PAYMENT_PENDING, PAYMENT_PAID, PAYMENT_FAILED];

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Returns the set of booking statuses that `from_status` may transition to.
///
/// - `pending`   -> `confirmed`, `cancelled`
/// - `confirmed` -> `cancelled`
/// - `cancelled` -> (terminal)
pub fn valid_transitions(from_status: &str) -> &'static [&'static str] {
    match from_status {
        STATUS_PENDING => &[STATUS_CONFIRMED, STATUS_CANCELLED],
        STATUS_CONFIRMED => &[STATUS_CANCELLED],
        _ => &[],
    }
}

/// Validate that a booking status transition from `current` to `next` is allowed.
pub fn validate_transition(current: &str, next: &str) -> Result<(), CoreError> {
    let allowed = valid_transitions(current);
    if allowed.contains(&next) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Cannot transition booking from '{current}' to '{next}'. Allowed transitions: {allowed:?}"
        )))
    }
}

/// Returns the set of payment statuses that `from_status` may transition to.
///
/// - `pending` -> `paid`, `failed`
/// - `failed`  -> `paid` (a late success after the checkout expired)
/// - `paid`    -> (terminal)
pub fn valid_payment_transitions(from_status: &str) -> &'static [&'static str] {
    match from_status {
        PAYMENT_PENDING => &[PAYMENT_PAID, PAYMENT_FAILED],
        PAYMENT_FAILED => &[PAYMENT_PAID],
        _ => &[],
    }
}

/// Validate that a payment status transition is allowed.
pub fn validate_payment_transition(current: &str, next: &str) -> Result<(), CoreError> {
    let allowed = valid_payment_transitions(current);
    if allowed.contains(&next) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Cannot transition payment from '{current}' to '{next}'. Allowed transitions: {allowed:?}"
        )))
    }
}

/// Validate that a status string is one of the known booking statuses.
pub fn validate_status(status: &str) -> Result<(), CoreError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid booking status '{status}'. Must be one of: {VALID_STATUSES:?}"
        )))
    }
}

/// Validate that a kind string is one of the known booking kinds.
pub fn validate_kind(kind: &str) -> Result<(), CoreError> {
    if VALID_KINDS.contains(&kind) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid booking kind '{kind}'. Must be one of: {VALID_KINDS:?}"
        )))
    }
}

/// Whether a booking in `status` still holds its seat or slot.
pub fn is_active_status(status: &str) -> bool {
    status != STATUS_CANCELLED
}

/// Whether a booking may be sent to checkout.
///
/// Only pending bookings with an outstanding, non-zero amount qualify.
pub fn can_checkout(status: &str, payment_status: &str, amount_cents: i64) -> Result<(), CoreError> {
    if status != STATUS_PENDING {
        return Err(CoreError::Conflict(format!(
            "Booking is {status} and cannot be paid"
        )));
    }
    if payment_status == PAYMENT_PAID {
        return Err(CoreError::Conflict("Booking is already paid".into()));
    }
    if amount_cents <= 0 {
        return Err(CoreError::Validation(
            "Booking has no amount due".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_statuses_are_valid() {
        for s in VALID_STATUSES {
            assert!(validate_status(s).is_ok(), "Status '{s}' should be valid");
        }
        assert!(validate_status("refunded").is_err());
        assert!(validate_status("").is_err());
    }

    #[test]
    fn pending_can_confirm_or_cancel() {
        assert!(validate_transition(STATUS_PENDING, STATUS_CONFIRMED).is_ok());
        assert!(validate_transition(STATUS_PENDING, STATUS_CANCELLED).is_ok());
    }

    #[test]
    fn confirmed_can_only_cancel() {
        assert!(validate_transition(STATUS_CONFIRMED, STATUS_CANCELLED).is_ok());
        assert!(validate_transition(STATUS_CONFIRMED, STATUS_PENDING).is_err());
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(valid_transitions(STATUS_CANCELLED).is_empty());
        let err = validate_transition(STATUS_CANCELLED, STATUS_CONFIRMED).unwrap_err();
        assert!(err.to_string().contains("Cannot transition booking"));
    }

    #[test]
    fn self_transition_is_rejected() {
        assert!(validate_transition(STATUS_PENDING, STATUS_PENDING).is_err());
    }

    #[test]
    fn paid_is_terminal() {
        assert!(validate_payment_transition(PAYMENT_PAID, PAYMENT_FAILED).is_err());
        assert!(validate_payment_transition(PAYMENT_PAID, PAYMENT_PENDING).is_err());
    }

    #[test]
    fn late_success_after_failure_is_accepted() {
        assert!(validate_payment_transition(PAYMENT_PENDING, PAYMENT_FAILED).is_ok());
        assert!(validate_payment_transition(PAYMENT_FAILED, PAYMENT_PAID).is_ok());
        assert!(validate_payment_transition(PAYMENT_FAILED, PAYMENT_PENDING).is_err());
    }

    #[test]
    fn kinds() {
        assert!(validate_kind(KIND_EVENT).is_ok());
        assert!(validate_kind(KIND_COACH).is_ok());
        assert!(validate_kind("court").is_err());
    }

    #[test]
    fn active_status() {
        assert!(is_active_status(STATUS_PENDING));
        assert!(is_active_status(STATUS_CONFIRMED));
        assert!(!is_active_status(STATUS_CANCELLED));
    }

    #[test]
    fn checkout_requires_pending_unpaid_nonzero() {
        assert!(can_checkout(STATUS_PENDING, PAYMENT_PENDING, 2500).is_ok());
        assert!(can_checkout(STATUS_PENDING, PAYMENT_FAILED, 2500).is_ok());
        assert!(matches!(
            can_checkout(STATUS_CONFIRMED, PAYMENT_PAID, 2500),
            Err(CoreError::Conflict(_))
        ));
        assert!(matches!(
            can_checkout(STATUS_PENDING, PAYMENT_PAID, 2500),
            Err(CoreError::Conflict(_))
        ));
        assert!(matches!(
            can_checkout(STATUS_PENDING, PAYMENT_PENDING, 0),
            Err(CoreError::Validation(_))
        ));
    }
}
