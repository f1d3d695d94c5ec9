//! Time-window validation for events and coach slots.

use crate::error::CoreError;
use crate::types::Timestamp;

/// Longest bookable coach slot.
pub const MAX_SLOT_MINUTES: i64 = 8 * 60;

/// Shortest bookable coach slot.
pub const MIN_SLOT_MINUTES: i64 = 15;

/// Validate that a window ends strictly after it starts.
pub fn validate_window(starts_at: Timestamp, ends_at: Timestamp) -> Result<(), CoreError> {
    if ends_at <= starts_at {
        return Err(CoreError::Validation(
            "ends_at must be after starts_at".into(),
        ));
    }
    Ok(())
}

/// Validate a coach slot window, including its length bounds.
pub fn validate_slot(starts_at: Timestamp, ends_at: Timestamp) -> Result<(), CoreError> {
    validate_window(starts_at, ends_at)?;
    let minutes = (ends_at - starts_at).num_minutes();
    if minutes < MIN_SLOT_MINUTES {
        return Err(CoreError::Validation(format!(
            "Slot must be at least {MIN_SLOT_MINUTES} minutes long"
        )));
    }
    if minutes > MAX_SLOT_MINUTES {
        return Err(CoreError::Validation(format!(
            "Slot must be at most {MAX_SLOT_MINUTES} minutes long"
        )));
    }
    Ok(())
}

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`.
pub fn overlaps(
    a_start: Timestamp,
    a_end: Timestamp,
    b_start: Timestamp,
    b_end: Timestamp,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Whether something starting at `starts_at` can still be booked at `now`.
pub fn is_bookable(starts_at: Timestamp, now: Timestamp) -> bool {
    starts_at > now
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(hour: u32, min: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, min, 0).unwrap()
    }

    #[test]
    fn window_must_be_positive() {
        assert!(validate_window(at(10, 0), at(11, 0)).is_ok());
        assert!(validate_window(at(10, 0), at(10, 0)).is_err());
        assert!(validate_window(at(11, 0), at(10, 0)).is_err());
    }

    #[test]
    fn slot_length_bounds() {
        assert!(validate_slot(at(10, 0), at(10, 10)).is_err());
        assert!(validate_slot(at(10, 0), at(10, 15)).is_ok());
        assert!(validate_slot(at(8, 0), at(16, 0)).is_ok());
        assert!(validate_slot(at(8, 0), at(16, 1)).is_err());
    }

    #[test]
    fn adjacent_windows_do_not_overlap() {
        assert!(!overlaps(at(10, 0), at(11, 0), at(11, 0), at(12, 0)));
        assert!(overlaps(at(10, 0), at(11, 0), at(10, 30), at(12, 0)));
        assert!(overlaps(at(10, 0), at(12, 0), at(10, 30), at(11, 0)));
    }

    #[test]
    fn past_start_is_not_bookable() {
        assert!(is_bookable(at(12, 0), at(11, 0)));
        assert!(!is_bookable(at(12, 0), at(12, 0)));
    }
}
