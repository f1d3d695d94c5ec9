//! Aggregate queries for the admin dashboard.

use sqlx::PgPool;

use crate::models::dashboard::DashboardStats;

pub struct DashboardRepo;

impl DashboardRepo {
    /// Compute the headline counts in a single round trip.
    pub async fn stats(pool: &PgPool) -> Result<DashboardStats, sqlx::Error> {
        sqlx::query_as::<_, DashboardStats>(
            "SELECT
                (SELECT COUNT(*) FROM users WHERE is_active) AS total_users,
                (SELECT COUNT(*) FROM events
                  WHERE is_published AND starts_at > NOW()) AS upcoming_events,
                (SELECT COUNT(*) FROM coaches WHERE is_active) AS active_coaches,
                (SELECT COUNT(*) FROM bookings WHERE status = 'pending') AS pending_bookings,
                (SELECT COUNT(*) FROM bookings WHERE status = 'confirmed') AS confirmed_bookings,
                (SELECT COUNT(*) FROM contact_messages WHERE NOT is_read) AS unread_messages,
                (SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM payments
                  WHERE status = 'paid') AS revenue_cents,
                (SELECT COUNT(*) FROM bookings
                  WHERE status = 'cancelled' AND payment_status = 'paid'
                    AND amount_cents > 0) AS refunds_due",
        )
        .fetch_one(pool)
        .await
    }
}
