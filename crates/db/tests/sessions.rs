use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use clubhouse_core::roles::DEFAULT_ROLE_ID;
use clubhouse_core::types::DbId;
use clubhouse_db::models::session::CreateSession;
use clubhouse_db::models::user::{CreateUser, PROVIDER_LOCAL};
use clubhouse_db::repositories::{Redemption, SessionRepo, UserRepo};
use sqlx::PgPool;

async fn new_user(pool: &PgPool) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            email: "session@example.com".to_string(),
            password_hash: Some("x".to_string()),
            full_name: "Session Holder".to_string(),
            phone: None,
            avatar_url: None,
            role_id: DEFAULT_ROLE_ID,
            auth_provider: PROVIDER_LOCAL.to_string(),
            provider_user_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn new_session(pool: &PgPool, user_id: DbId, hash: &str, expires_in: Duration) {
    SessionRepo::create(
        pool,
        &CreateSession {
            user_id,
            refresh_token_hash: hash.to_string(),
            expires_at: Utc::now() + expires_in,
        },
    )
    .await
    .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_refresh_token_redeems_once(pool: PgPool) {
    let user = new_user(&pool).await;
    new_session(&pool, user, "hash-a", Duration::days(7)).await;

    let first = SessionRepo::redeem(&pool, "hash-a").await.unwrap();
    assert_matches!(first, Redemption::Redeemed(session) if session.user_id == user && session.is_revoked);

    let second = SessionRepo::redeem(&pool, "hash-a").await.unwrap();
    assert_matches!(second, Redemption::Replayed { user_id } if user_id == user);

    let unknown = SessionRepo::redeem(&pool, "nope").await.unwrap();
    assert_matches!(unknown, Redemption::Invalid);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_expired_token_is_invalid_not_replayed(pool: PgPool) {
    let user = new_user(&pool).await;
    new_session(&pool, user, "old", Duration::minutes(-5)).await;

    assert_matches!(
        SessionRepo::redeem(&pool, "old").await.unwrap(),
        Redemption::Invalid
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_purge_keeps_recently_revoked(pool: PgPool) {
    let user = new_user(&pool).await;
    new_session(&pool, user, "live", Duration::days(7)).await;
    new_session(&pool, user, "revoked", Duration::days(7)).await;
    new_session(&pool, user, "expired", Duration::minutes(-5)).await;
    SessionRepo::redeem(&pool, "revoked").await.unwrap();

    let deleted = SessionRepo::purge(&pool, Utc::now() - Duration::days(7))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    // A cutoff in the future also takes the revoked row.
    let deleted = SessionRepo::purge(&pool, Utc::now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    assert_eq!(SessionRepo::revoke_all_for_user(&pool, user).await.unwrap(), 1);
}
