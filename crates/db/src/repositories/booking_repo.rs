//! Repository for the `bookings` table.
//!
//! Creating a booking and moving it through its lifecycle happen inside a
//! transaction that locks the booked item (event or slot) or the booking row
//! itself, so capacity and single-holder rules hold under concurrency. The
//! partial unique indexes on `bookings` remain the last line of defence.

use chrono::Utc;
use clubhouse_core::booking::{
    self, KIND_COACH, KIND_EVENT, PAYMENT_FAILED, PAYMENT_PAID, PAYMENT_PENDING,
    STATUS_CANCELLED, STATUS_CONFIRMED, STATUS_PENDING,
};
use clubhouse_core::error::CoreError;
use clubhouse_core::pricing;
use clubhouse_core::schedule;
use clubhouse_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::error::RepoError;
use crate::models::booking::{
    Booking, BookingDetail, BookingFilter, NewCoachBooking, NewEventBooking, StatusChange,
};
use crate::repositories::PaymentRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, kind, event_id, coach_slot_id, status, payment_status, \
                        amount_cents, currency, notes, cancelled_at, created_at, updated_at";

/// Booking columns plus what was booked and by whom.
const DETAIL_SELECT: &str = "SELECT b.id, b.user_id, b.kind, b.event_id, b.coach_slot_id, \
        b.status, b.payment_status, b.amount_cents, b.currency, b.notes, b.cancelled_at, \
        b.created_at, b.updated_at, \
        COALESCE(e.title, c.name) AS item_title, \
        s.coach_id, \
        COALESCE(e.starts_at, s.starts_at) AS starts_at, \
        COALESCE(e.ends_at, s.ends_at) AS ends_at, \
        u.email AS user_email \
     FROM bookings b \
     JOIN users u ON u.id = b.user_id \
     LEFT JOIN events e ON e.id = b.event_id \
     LEFT JOIN coach_slots s ON s.id = b.coach_slot_id \
     LEFT JOIN coaches c ON c.id = s.coach_id";

/// Initial `(status, payment_status)` for a booking of `amount_cents`.
///
/// Free bookings have nothing to collect and are confirmed immediately.
fn initial_state(amount_cents: i64) -> (&'static str, &'static str) {
    if amount_cents == 0 {
        (STATUS_CONFIRMED, PAYMENT_PAID)
    } else {
        (STATUS_PENDING, PAYMENT_PENDING)
    }
}

/// Provides booking creation and lifecycle operations.
pub struct BookingRepo;

impl BookingRepo {
    /// Reserve a seat at an event for `input.user_id`.
    ///
    /// The event row is locked for the duration of the check-and-insert so
    /// concurrent registrations cannot overbook it. The amount and currency
    /// are snapshotted from the event.
    pub async fn create_event_booking(
        pool: &PgPool,
        input: &NewEventBooking,
    ) -> Result<Booking, RepoError> {
        let mut tx = pool.begin().await?;

        let event: Option<(i32, i64, String, bool, Timestamp)> = sqlx::query_as(
            "SELECT capacity, price_cents, currency, is_published, starts_at
             FROM events WHERE id = $1
             FOR UPDATE",
        )
        .bind(input.event_id)
        .fetch_optional(&mut *tx)
        .await?;

        let not_found = || CoreError::NotFound {
            entity: "Event",
            id: input.event_id,
        };
        let (capacity, price_cents, currency, is_published, starts_at) =
            event.ok_or_else(not_found)?;
        if !is_published {
            return Err(not_found().into());
        }
        if !schedule::is_bookable(starts_at, Utc::now()) {
            return Err(CoreError::Validation("Event has already started".into()).into());
        }

        let already_registered: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled'
             )",
        )
        .bind(input.event_id)
        .bind(input.user_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_registered {
            return Err(CoreError::AlreadyRegistered {
                event_id: input.event_id,
            }
            .into());
        }

        let taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE event_id = $1 AND status <> 'cancelled'",
        )
        .bind(input.event_id)
        .fetch_one(&mut *tx)
        .await?;
        if taken >= i64::from(capacity) {
            return Err(CoreError::EventFull {
                event_id: input.event_id,
            }
            .into());
        }

        let (status, payment_status) = initial_state(price_cents);
        let query = format!(
            "INSERT INTO bookings
                (user_id, kind, event_id, status, payment_status, amount_cents, currency, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(input.user_id)
            .bind(KIND_EVENT)
            .bind(input.event_id)
            .bind(status)
            .bind(payment_status)
            .bind(price_cents)
            .bind(&currency)
            .bind(&input.notes)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(booking)
    }

    /// Reserve a coach slot for `input.user_id`.
    ///
    /// The slot row is locked while availability is checked. The amount is
    /// the coach's hourly rate prorated over the slot length.
    pub async fn create_coach_booking(
        pool: &PgPool,
        input: &NewCoachBooking,
    ) -> Result<Booking, RepoError> {
        let mut tx = pool.begin().await?;

        let slot: Option<(Timestamp, Timestamp, i64, String, bool)> = sqlx::query_as(
            "SELECT s.starts_at, s.ends_at, c.hourly_rate_cents, c.currency, c.is_active
             FROM coach_slots s
             JOIN coaches c ON c.id = s.coach_id
             WHERE s.id = $1
             FOR UPDATE OF s",
        )
        .bind(input.coach_slot_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (starts_at, ends_at, hourly_rate_cents, currency, coach_active) =
            slot.ok_or(CoreError::NotFound {
                entity: "CoachSlot",
                id: input.coach_slot_id,
            })?;
        let unavailable = CoreError::SlotUnavailable {
            slot_id: input.coach_slot_id,
        };
        if !coach_active || !schedule::is_bookable(starts_at, Utc::now()) {
            return Err(unavailable.into());
        }

        let held: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE coach_slot_id = $1 AND status <> 'cancelled'
             )",
        )
        .bind(input.coach_slot_id)
        .fetch_one(&mut *tx)
        .await?;
        if held {
            return Err(unavailable.into());
        }

        let amount_cents = pricing::coach_session_price(hourly_rate_cents, starts_at, ends_at)?;
        let (status, payment_status) = initial_state(amount_cents);
        let query = format!(
            "INSERT INTO bookings
                (user_id, kind, coach_slot_id, status, payment_status, amount_cents, currency, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(input.user_id)
            .bind(KIND_COACH)
            .bind(input.coach_slot_id)
            .bind(status)
            .bind(payment_status)
            .bind(amount_cents)
            .bind(&currency)
            .bind(&input.notes)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(booking)
    }

    /// Find a booking by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a booking with its item details.
    pub async fn find_detail(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BookingDetail>, sqlx::Error> {
        let query = format!("{DETAIL_SELECT} WHERE b.id = $1");
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All bookings of one user, upcoming items first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<BookingDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT} WHERE b.user_id = $1
             ORDER BY COALESCE(e.starts_at, s.starts_at) DESC, b.id DESC"
        );
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Admin listing, newest first. `filter.limit`/`offset` must already be clamped.
    pub async fn list(
        pool: &PgPool,
        filter: &BookingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookingDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE ($1::TEXT IS NULL OR b.status = $1)
               AND ($2::TEXT IS NULL OR b.kind = $2)
               AND ($3::BIGINT IS NULL OR b.user_id = $3)
             ORDER BY b.created_at DESC, b.id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(&filter.status)
            .bind(&filter.kind)
            .bind(filter.user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Move a booking to `next` status, enforcing the transition rules.
    ///
    /// Cancelling stamps `cancelled_at` and releases the seat or slot. An
    /// unpaid booking's payment becomes `failed` and its open checkouts are
    /// failed with it; a payment that lands later still records as paid and
    /// surfaces as a refund due.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        next: &str,
    ) -> Result<StatusChange, RepoError> {
        booking::validate_status(next)?;
        let mut tx = pool.begin().await?;

        let current = Self::lock(&mut *tx, id).await?;
        booking::validate_transition(&current.status, next)?;

        let abandon_payment =
            next == STATUS_CANCELLED && current.payment_status == PAYMENT_PENDING;
        let payment_status = if abandon_payment {
            PAYMENT_FAILED
        } else {
            current.payment_status.as_str()
        };

        let query = format!(
            "UPDATE bookings SET
                status = $2,
                payment_status = $3,
                cancelled_at = CASE WHEN $2 = 'cancelled' THEN NOW() ELSE cancelled_at END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(next)
            .bind(payment_status)
            .fetch_one(&mut *tx)
            .await?;

        let closed_checkouts = if abandon_payment {
            PaymentRepo::fail_open_for_booking(&mut *tx, id).await?
        } else {
            Vec::new()
        };

        tx.commit().await?;
        Ok(StatusChange {
            booking: updated,
            closed_checkouts,
        })
    }

    /// Cancel a booking. Shorthand for [`Self::update_status`] to `cancelled`.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<StatusChange, RepoError> {
        Self::update_status(pool, id, STATUS_CANCELLED).await
    }

    /// Lock a booking row for the rest of the surrounding transaction.
    pub async fn lock(conn: &mut PgConnection, id: DbId) -> Result<Booking, RepoError> {
        let query = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "Booking",
                    id,
                }
                .into()
            })
    }

    /// Record a successful payment. A pending booking becomes confirmed.
    ///
    /// Already-paid bookings are returned unchanged. A booking that was
    /// cancelled before the payment landed stays cancelled but is marked
    /// paid, which surfaces it as a refund to issue.
    pub async fn record_payment_success(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Booking, RepoError> {
        let current = Self::lock(conn, id).await?;
        if current.payment_status == PAYMENT_PAID {
            return Ok(current);
        }
        booking::validate_payment_transition(&current.payment_status, PAYMENT_PAID)?;

        let next_status = if current.status == STATUS_PENDING {
            STATUS_CONFIRMED
        } else {
            current.status.as_str()
        };
        let query = format!(
            "UPDATE bookings SET payment_status = $2, status = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(PAYMENT_PAID)
            .bind(next_status)
            .fetch_one(conn)
            .await?;
        Ok(updated)
    }

    /// Record a failed or abandoned payment. A pending booking is cancelled.
    ///
    /// Only bookings whose payment is still pending are touched; the row is
    /// returned unchanged otherwise.
    pub async fn record_payment_failure(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Booking, RepoError> {
        let current = Self::lock(conn, id).await?;
        if current.payment_status != PAYMENT_PENDING {
            return Ok(current);
        }

        let query = format!(
            "UPDATE bookings SET
                payment_status = $2,
                status = CASE WHEN status = 'pending' THEN 'cancelled' ELSE status END,
                cancelled_at = CASE WHEN status = 'pending' THEN NOW() ELSE cancelled_at END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(PAYMENT_FAILED)
            .fetch_one(conn)
            .await?;
        Ok(updated)
    }

    /// Cancel pending, unpaid bookings created before `cutoff`, failing any
    /// checkout still open for them. Returns the IDs of expired bookings.
    ///
    /// A booking whose checkout was opened at or after `cutoff` keeps its
    /// hold until that session runs out.
    pub async fn expire_unpaid(pool: &PgPool, cutoff: Timestamp) -> Result<Vec<DbId>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let expired: Vec<DbId> = sqlx::query_scalar(
            "UPDATE bookings SET
                status = 'cancelled',
                payment_status = 'failed',
                cancelled_at = NOW()
             WHERE status = 'pending'
               AND payment_status = 'pending'
               AND created_at < $1
               AND NOT EXISTS (
                   SELECT 1 FROM payments p
                   WHERE p.booking_id = bookings.id
                     AND p.status = 'pending'
                     AND p.created_at >= $1
               )
             RETURNING id",
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await?;

        if !expired.is_empty() {
            sqlx::query(
                "UPDATE payments SET status = 'failed'
                 WHERE booking_id = ANY($1) AND status = 'pending'",
            )
            .bind(&expired)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(expired)
    }
}
