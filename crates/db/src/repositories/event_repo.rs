//! Repository for the `events` table.

use clubhouse_core::error::CoreError;
use clubhouse_core::pricing::DEFAULT_CURRENCY;
use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::error::RepoError;
use crate::models::event::{CreateEvent, Event, EventFilter, EventWithAvailability, UpdateEvent};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, description, category, location, starts_at, ends_at, \
                        capacity, price_cents, currency, image_url, is_published, \
                        created_at, updated_at";

/// Same columns qualified with the `e` alias plus the live registration count.
const AVAILABILITY_COLUMNS: &str = "e.id, e.title, e.description, e.category, e.location, \
    e.starts_at, e.ends_at, e.capacity, e.price_cents, e.currency, e.image_url, \
    e.is_published, e.created_at, e.updated_at, \
    (SELECT COUNT(*) FROM bookings b \
      WHERE b.event_id = e.id AND b.status <> 'cancelled') AS registered_count";

/// Provides CRUD operations for club events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event, returning the created row.
    ///
    /// `currency` must already be normalized; defaults to `eur`.
    pub async fn create(pool: &PgPool, input: &CreateEvent) -> Result<Event, sqlx::Error> {
        let query = format!(
            "INSERT INTO events
                (title, description, category, location, starts_at, ends_at,
                 capacity, price_cents, currency, image_url, is_published)
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 0), COALESCE($9, $10),
                     $11, COALESCE($12, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.category)
            .bind(&input.location)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(input.capacity)
            .bind(input.price_cents)
            .bind(&input.currency)
            .bind(DEFAULT_CURRENCY)
            .bind(&input.image_url)
            .bind(input.is_published)
            .fetch_one(pool)
            .await
    }

    /// Find an event with its registration count.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<EventWithAvailability>, sqlx::Error> {
        let query = format!("SELECT {AVAILABILITY_COLUMNS} FROM events e WHERE e.id = $1");
        sqlx::query_as::<_, EventWithAvailability>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List events in start order, applying `filter`.
    pub async fn list(
        pool: &PgPool,
        filter: &EventFilter,
    ) -> Result<Vec<EventWithAvailability>, sqlx::Error> {
        let query = format!(
            "SELECT {AVAILABILITY_COLUMNS} FROM events e
             WHERE ($1 OR e.is_published)
               AND (NOT $2 OR e.starts_at > NOW())
               AND ($3::TEXT IS NULL OR e.category = $3)
             ORDER BY e.starts_at ASC, e.id ASC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, EventWithAvailability>(&query)
            .bind(filter.include_unpublished)
            .bind(filter.upcoming_only)
            .bind(&filter.category)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// Update an event. Only non-`None` fields in `input` are applied.
    ///
    /// The event row is locked while a new capacity is checked against the
    /// seats taken, so a registration racing the update cannot leave the
    /// event overbooked. Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateEvent,
    ) -> Result<Option<Event>, RepoError> {
        let mut tx = pool.begin().await?;

        let exists: Option<DbId> =
            sqlx::query_scalar("SELECT id FROM events WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(None);
        }

        if let Some(capacity) = input.capacity {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM bookings WHERE event_id = $1 AND status <> 'cancelled'",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if i64::from(capacity) < taken {
                return Err(CoreError::Conflict(format!(
                    "Capacity cannot be lower than the {taken} seats already booked"
                ))
                .into());
            }
        }

        let query = format!(
            "UPDATE events SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                location = COALESCE($5, location),
                starts_at = COALESCE($6, starts_at),
                ends_at = COALESCE($7, ends_at),
                capacity = COALESCE($8, capacity),
                price_cents = COALESCE($9, price_cents),
                currency = COALESCE($10, currency),
                image_url = COALESCE($11, image_url),
                is_published = COALESCE($12, is_published)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let event = sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.category)
            .bind(&input.location)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(input.capacity)
            .bind(input.price_cents)
            .bind(&input.currency)
            .bind(&input.image_url)
            .bind(input.is_published)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(event))
    }

    /// Delete an event. Returns `true` if a row was removed.
    ///
    /// Events referenced by any booking are protected by the foreign key and
    /// fail with a `23503` violation; unpublish those instead.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
