//! Periodic release of unpaid booking holds.
//!
//! A booking that stays `pending` and unpaid for longer than the hold window
//! is cancelled, which frees its coach slot and stops counting against the
//! event's capacity.

use std::time::Duration;

use chrono::Utc;
use clubhouse_db::repositories::BookingRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::config::CHECKOUT_EXPIRY_MARGIN_MINUTES;

/// How often the sweeper runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the unpaid-booking sweeper until `cancel` is triggered.
pub async fn run(pool: PgPool, hold_minutes: i64, cancel: CancellationToken) {
    tracing::info!(
        hold_minutes,
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Booking expiry job started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Booking expiry job stopping");
                break;
            }
            _ = interval.tick() => {
                sweep_once(&pool, hold_minutes).await;
            }
        }
    }
}

/// One sweep: cancel every unpaid booking older than the hold.
///
/// The window includes the checkout margin, so a booking is never released
/// while its checkout can still be paid.
pub async fn sweep_once(pool: &PgPool, hold_minutes: i64) -> usize {
    let cutoff =
        Utc::now() - chrono::Duration::minutes(hold_minutes + CHECKOUT_EXPIRY_MARGIN_MINUTES);
    match BookingRepo::expire_unpaid(pool, cutoff).await {
        Ok(expired) => {
            if expired.is_empty() {
                tracing::debug!("Booking expiry: nothing to release");
            } else {
                tracing::info!(
                    count = expired.len(),
                    booking_ids = ?expired,
                    "Booking expiry: released unpaid holds"
                );
            }
            expired.len()
        }
        Err(e) => {
            tracing::error!(error = %e, "Booking expiry: sweep failed");
            0
        }
    }
}
