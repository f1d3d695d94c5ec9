//! Repository for the `payment_webhook_events` table.

use sqlx::PgConnection;

/// Records which provider webhook events have been processed.
pub struct WebhookEventRepo;

impl WebhookEventRepo {
    /// Claim a provider event ID inside the caller's transaction.
    ///
    /// Returns `false` when the event was already processed. If the
    /// transaction rolls back the claim is released and a redelivery is
    /// processed again.
    pub async fn record(
        conn: &mut PgConnection,
        event_id: &str,
        event_type: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO payment_webhook_events (event_id, event_type)
             VALUES ($1, $2)
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(event_id)
        .bind(event_type)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
