//! Hourly purge of expired and revoked refresh sessions.

use std::time::Duration;

use chrono::Utc;
use clubhouse_core::types::Timestamp;
use clubhouse_db::repositories::SessionRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the session cleanup loop until `cancel` is triggered.
///
/// Revoked sessions are kept for `refresh_expiry_days`, as long as the
/// token they held could have stayed valid, so a replay is recognised for
/// the token's whole lifetime.
pub async fn run(pool: PgPool, refresh_expiry_days: i64, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        retention_days = refresh_expiry_days,
        "Session cleanup job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                purge_once(&pool, refresh_expiry_days).await;
            }
        }
    }
}

/// One purge pass. Returns the number of deleted sessions.
pub async fn purge_once(pool: &PgPool, refresh_expiry_days: i64) -> u64 {
    match SessionRepo::purge(pool, revoked_cutoff(Utc::now(), refresh_expiry_days)).await {
        Ok(0) => {
            tracing::debug!("Session cleanup: no rows to purge");
            0
        }
        Ok(deleted) => {
            tracing::info!(deleted, "Session cleanup: purged sessions");
            deleted
        }
        Err(e) => {
            tracing::error!(error = %e, "Session cleanup failed");
            0
        }
    }
}

/// Revoked sessions last touched before this instant can be deleted.
fn revoked_cutoff(now: Timestamp, refresh_expiry_days: i64) -> Timestamp {
    now - chrono::Duration::days(refresh_expiry_days)
}
