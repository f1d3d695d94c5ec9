//! Repository for the `payments` table.

use clubhouse_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::error::RepoError;
use crate::models::booking::Booking;
use crate::models::payment::{CreatePayment, Payment, SessionOutcome};
use crate::repositories::BookingRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, booking_id, user_id, provider, provider_session_id, \
                        payment_intent_id, amount_cents, currency, status, checkout_url, \
                        created_at, updated_at";

/// Provides checkout payment bookkeeping.
pub struct PaymentRepo;

impl PaymentRepo {
    /// Record a checkout session that was just opened with the provider.
    pub async fn create(pool: &PgPool, input: &CreatePayment) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments
                (booking_id, user_id, provider, provider_session_id, amount_cents,
                 currency, checkout_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(input.booking_id)
            .bind(input.user_id)
            .bind(&input.provider)
            .bind(&input.provider_session_id)
            .bind(input.amount_cents)
            .bind(&input.currency)
            .bind(&input.checkout_url)
            .fetch_one(pool)
            .await
    }

    /// Find a payment by the provider's checkout session ID.
    pub async fn find_by_session_id(
        pool: &PgPool,
        provider: &str,
        session_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments WHERE provider = $1 AND provider_session_id = $2"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(provider)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// The most recent still-pending checkout for a booking, if any.
    pub async fn find_open_for_booking(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments
             WHERE booking_id = $1 AND status = 'pending'
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(booking_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark every pending checkout of a booking failed, inside the caller's
    /// transaction. Returns the payments that were closed.
    pub async fn fail_open_for_booking(
        conn: &mut PgConnection,
        booking_id: DbId,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET status = 'failed'
             WHERE booking_id = $1 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(booking_id)
            .fetch_all(conn)
            .await
    }

    /// All payment attempts for a booking, newest first.
    pub async fn list_for_booking(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments WHERE booking_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(booking_id)
            .fetch_all(pool)
            .await
    }

    /// Apply the provider-reported outcome of a checkout session to the
    /// payment and its booking, inside the caller's transaction.
    ///
    /// Returns `None` when the session is unknown. Re-applying an outcome
    /// that was already recorded leaves both rows unchanged, and a failure
    /// never overrides a recorded success.
    pub async fn apply_outcome(
        conn: &mut PgConnection,
        provider: &str,
        session_id: &str,
        outcome: &SessionOutcome,
    ) -> Result<Option<(Payment, Booking)>, RepoError> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments
             WHERE provider = $1 AND provider_session_id = $2
             FOR UPDATE"
        );
        let Some(payment) = sqlx::query_as::<_, Payment>(&query)
            .bind(provider)
            .bind(session_id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let (payment, booking) = match outcome {
            SessionOutcome::Paid { payment_intent_id } => {
                let booking = BookingRepo::record_payment_success(&mut *conn, payment.booking_id)
                    .await?;
                let query = format!(
                    "UPDATE payments SET
                        status = 'paid',
                        payment_intent_id = COALESCE($2, payment_intent_id)
                     WHERE id = $1
                     RETURNING {COLUMNS}"
                );
                let payment = sqlx::query_as::<_, Payment>(&query)
                    .bind(payment.id)
                    .bind(payment_intent_id)
                    .fetch_one(&mut *conn)
                    .await?;
                (payment, booking)
            }
            SessionOutcome::Failed => {
                let booking = BookingRepo::record_payment_failure(&mut *conn, payment.booking_id)
                    .await?;
                let query = format!(
                    "UPDATE payments SET status = 'failed'
                     WHERE id = $1 AND status = 'pending'
                     RETURNING {COLUMNS}"
                );
                let updated = sqlx::query_as::<_, Payment>(&query)
                    .bind(payment.id)
                    .fetch_optional(&mut *conn)
                    .await?;
                (updated.unwrap_or(payment), booking)
            }
        };

        Ok(Some((payment, booking)))
    }
}
