//! Aggregate counts for the admin console.

use serde::Serialize;
use sqlx::FromRow;

/// Headline numbers shown on the admin dashboard.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub upcoming_events: i64,
    pub active_coaches: i64,
    pub pending_bookings: i64,
    pub confirmed_bookings: i64,
    pub unread_messages: i64,
    /// Sum of paid payments, in minor units, across all currencies.
    pub revenue_cents: i64,
    /// Cancelled bookings whose payment still landed; these need a refund.
    pub refunds_due: i64,
}
