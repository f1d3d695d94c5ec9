//! Repository for the `coaches` table.

use clubhouse_core::pricing::DEFAULT_CURRENCY;
use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::coach::{Coach, CreateCoach, UpdateCoach};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, specialty, bio, hourly_rate_cents, currency, image_url, \
                        is_active, created_at, updated_at";

/// Provides CRUD operations for coaches.
pub struct CoachRepo;

impl CoachRepo {
    /// Insert a new coach, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateCoach) -> Result<Coach, sqlx::Error> {
        let query = format!(
            "INSERT INTO coaches (name, specialty, bio, hourly_rate_cents, currency, image_url)
             VALUES ($1, $2, $3, $4, COALESCE($5, $6), $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Coach>(&query)
            .bind(&input.name)
            .bind(&input.specialty)
            .bind(&input.bio)
            .bind(input.hourly_rate_cents)
            .bind(&input.currency)
            .bind(DEFAULT_CURRENCY)
            .bind(&input.image_url)
            .fetch_one(pool)
            .await
    }

    /// Find a coach by ID, active or not.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Coach>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM coaches WHERE id = $1");
        sqlx::query_as::<_, Coach>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List coaches by name. Inactive coaches only when `include_inactive`.
    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<Coach>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM coaches
             WHERE ($1 OR is_active)
             ORDER BY name ASC, id ASC"
        );
        sqlx::query_as::<_, Coach>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    /// Update a coach. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCoach,
    ) -> Result<Option<Coach>, sqlx::Error> {
        let query = format!(
            "UPDATE coaches SET
                name = COALESCE($2, name),
                specialty = COALESCE($3, specialty),
                bio = COALESCE($4, bio),
                hourly_rate_cents = COALESCE($5, hourly_rate_cents),
                currency = COALESCE($6, currency),
                image_url = COALESCE($7, image_url),
                is_active = COALESCE($8, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Coach>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.specialty)
            .bind(&input.bio)
            .bind(input.hourly_rate_cents)
            .bind(&input.currency)
            .bind(&input.image_url)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Retire a coach so they no longer appear or accept bookings.
    ///
    /// Existing slots and bookings are kept for history.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE coaches SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
