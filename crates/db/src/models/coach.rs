//! Coach and coach-slot models and DTOs.

use clubhouse_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A coach row from the `coaches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Coach {
    pub id: DbId,
    pub name: String,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub hourly_rate_cents: i64,
    pub currency: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new coach.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCoach {
    pub name: String,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub hourly_rate_cents: i64,
    pub currency: Option<String>,
    pub image_url: Option<String>,
}

/// DTO for updating an existing coach. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCoach {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub hourly_rate_cents: Option<i64>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// A bookable time window from the `coach_slots` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CoachSlot {
    pub id: DbId,
    pub coach_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A slot annotated with whether a live booking holds it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CoachSlotAvailability {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub slot: CoachSlot,
    pub is_booked: bool,
}

/// DTO for creating a slot.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCoachSlot {
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
}

/// Filters for listing a coach's slots.
#[derive(Debug, Clone, Default)]
pub struct SlotFilter {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub include_booked: bool,
}
