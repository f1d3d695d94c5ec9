//! Club event model and DTOs.

use clubhouse_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An event row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub capacity: i32,
    pub price_cents: i64,
    pub currency: String,
    pub image_url: Option<String>,
    pub is_published: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An event with its live registration count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventWithAvailability {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    /// Non-cancelled bookings for this event.
    pub registered_count: i64,
}

impl EventWithAvailability {
    /// Seats still open.
    pub fn spots_left(&self) -> i64 {
        (i64::from(self.event.capacity) - self.registered_count).max(0)
    }
}

/// DTO for creating a new event.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvent {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub capacity: i32,
    /// Defaults to 0 (free) if omitted.
    pub price_cents: Option<i64>,
    /// Defaults to `eur` if omitted.
    pub currency: Option<String>,
    pub image_url: Option<String>,
    /// Defaults to `true` if omitted.
    pub is_published: Option<bool>,
}

/// DTO for updating an existing event. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    pub capacity: Option<i32>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
    pub is_published: Option<bool>,
}

/// Filters for listing events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only events that have not started yet.
    pub upcoming_only: bool,
    pub category: Option<String>,
    /// Admin view: also return unpublished events.
    pub include_unpublished: bool,
    pub limit: i64,
    pub offset: i64,
}
