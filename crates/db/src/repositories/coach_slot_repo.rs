//! Repository for the `coach_slots` table.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::coach::{CoachSlot, CoachSlotAvailability, CreateCoachSlot, SlotFilter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, coach_id, starts_at, ends_at, created_at, updated_at";

/// Provides slot management for coaches.
pub struct CoachSlotRepo;

impl CoachSlotRepo {
    /// Insert a slot for `coach_id`.
    ///
    /// Overlapping slots of the same coach fail with the
    /// `ex_coach_slots_overlap` exclusion constraint (`23P01`).
    pub async fn create(
        pool: &PgPool,
        coach_id: DbId,
        input: &CreateCoachSlot,
    ) -> Result<CoachSlot, sqlx::Error> {
        let query = format!(
            "INSERT INTO coach_slots (coach_id, starts_at, ends_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CoachSlot>(&query)
            .bind(coach_id)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .fetch_one(pool)
            .await
    }

    /// Find a slot by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CoachSlot>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM coach_slots WHERE id = $1");
        sqlx::query_as::<_, CoachSlot>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Future slots of a coach in start order, annotated with booking state.
    pub async fn list_for_coach(
        pool: &PgPool,
        coach_id: DbId,
        filter: &SlotFilter,
    ) -> Result<Vec<CoachSlotAvailability>, sqlx::Error> {
        sqlx::query_as::<_, CoachSlotAvailability>(
            "SELECT s.id, s.coach_id, s.starts_at, s.ends_at, s.created_at, s.updated_at,
                    EXISTS (
                        SELECT 1 FROM bookings b
                        WHERE b.coach_slot_id = s.id AND b.status <> 'cancelled'
                    ) AS is_booked
             FROM coach_slots s
             WHERE s.coach_id = $1
               AND s.starts_at >= COALESCE($2, NOW())
               AND ($3::TIMESTAMPTZ IS NULL OR s.starts_at < $3)
             ORDER BY s.starts_at ASC",
        )
        .bind(coach_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(pool)
        .await
        .map(|slots| {
            slots
                .into_iter()
                .filter(|s| filter.include_booked || !s.is_booked)
                .collect()
        })
    }

    /// Delete a slot of `coach_id` that was never booked.
    ///
    /// Returns `false` when the slot does not exist, belongs to another coach,
    /// or is referenced by a booking.
    pub async fn delete_unbooked(
        pool: &PgPool,
        coach_id: DbId,
        slot_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM coach_slots s
             WHERE s.id = $1 AND s.coach_id = $2
               AND NOT EXISTS (SELECT 1 FROM bookings b WHERE b.coach_slot_id = s.id)",
        )
        .bind(slot_id)
        .bind(coach_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
