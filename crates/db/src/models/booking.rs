//! Booking model and DTOs.
//!
//! A booking references exactly one of an event or a coach slot; the
//! `kind` column says which (see `clubhouse_core::booking`).

use clubhouse_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::payment::Payment;

/// A booking row from the `bookings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub event_id: Option<DbId>,
    pub coach_slot_id: Option<DbId>,
    pub status: String,
    pub payment_status: String,
    pub amount_cents: i64,
    pub currency: String,
    pub notes: Option<String>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A booking joined with what was booked, for listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    /// Event title or coach name.
    pub item_title: String,
    pub coach_id: Option<DbId>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub user_email: String,
}

/// Outcome of a booking status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking: Booking,
    /// Checkouts that were still open and are now marked failed. Their
    /// provider sessions must be expired so they can no longer be paid.
    pub closed_checkouts: Vec<Payment>,
}

/// Input for booking a seat at an event.
#[derive(Debug, Clone)]
pub struct NewEventBooking {
    pub user_id: DbId,
    pub event_id: DbId,
    pub notes: Option<String>,
}

/// Input for booking a coach slot.
#[derive(Debug, Clone)]
pub struct NewCoachBooking {
    pub user_id: DbId,
    pub coach_slot_id: DbId,
    pub notes: Option<String>,
}

/// Filters for the admin booking listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<String>,
    pub kind: Option<String>,
    pub user_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
