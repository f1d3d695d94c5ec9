//! Integration tests for the booking expiry and session cleanup passes.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use clubhouse_api::background::{booking_expiry, session_cleanup};
use clubhouse_db::models::booking::NewEventBooking;
use clubhouse_db::models::session::CreateSession;
use clubhouse_db::repositories::{BookingRepo, Redemption, SessionRepo};
use common::{create_event, create_member};
use sqlx::PgPool;

async fn backdate_booking(pool: &PgPool, id: i64, age: Duration) {
    sqlx::query("UPDATE bookings SET created_at = $2 WHERE id = $1")
        .bind(id)
        .bind(Utc::now() - age)
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sweep_waits_for_checkout_margin(pool: PgPool) {
    let member = create_member(&pool, "holder@test.com").await;
    let event_id = create_event(&pool, 10, 2500).await;
    let booking = BookingRepo::create_event_booking(
        &pool,
        &NewEventBooking {
            user_id: member.id,
            event_id,
            notes: None,
        },
    )
    .await
    .unwrap();

    // Past the hold but inside the checkout's extra minute.
    backdate_booking(&pool, booking.id, Duration::seconds(30 * 60 + 20)).await;
    assert_eq!(booking_expiry::sweep_once(&pool, 30).await, 0);

    backdate_booking(&pool, booking.id, Duration::minutes(32)).await;
    assert_eq!(booking_expiry::sweep_once(&pool, 30).await, 1);

    let released = BookingRepo::find_by_id(&pool, booking.id).await.unwrap().unwrap();
    assert_eq!(released.status, "cancelled");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_revoked_sessions_kept_for_refresh_lifetime(pool: PgPool) {
    let member = create_member(&pool, "sessions@test.com").await;
    for hash in ["recent", "stale"] {
        SessionRepo::create(
            &pool,
            &CreateSession {
                user_id: member.id,
                refresh_token_hash: hash.to_string(),
                expires_at: Utc::now() + Duration::days(30),
            },
        )
        .await
        .unwrap();
        SessionRepo::redeem(&pool, hash).await.unwrap();
    }

    // The trigger would reset updated_at on this write.
    sqlx::query("ALTER TABLE user_sessions DISABLE TRIGGER set_updated_at")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "UPDATE user_sessions SET updated_at = NOW() - INTERVAL '10 days'
         WHERE refresh_token_hash = 'stale'",
    )
    .execute(&pool)
    .await
    .unwrap();

    // Thirty-day tokens: a replay ten days after rotation must still be caught.
    assert_eq!(session_cleanup::purge_once(&pool, 30).await, 0);
    assert_matches!(
        SessionRepo::redeem(&pool, "stale").await.unwrap(),
        Redemption::Replayed { .. }
    );

    // Seven-day tokens: a ten-day-old revocation is past any token it covered.
    assert_eq!(session_cleanup::purge_once(&pool, 7).await, 1);
    assert_matches!(
        SessionRepo::redeem(&pool, "recent").await.unwrap(),
        Redemption::Replayed { .. }
    );
}
