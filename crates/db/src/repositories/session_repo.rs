//! Refresh-token sessions. A refresh token is single use: redeeming it
//! revokes its row, and the caller issues a fresh session.

use clubhouse_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::session::{CreateSession, UserSession};

const COLUMNS: &str = "id, user_id, refresh_token_hash, expires_at, is_revoked, created_at, updated_at";

/// Result of presenting a refresh token.
#[derive(Debug)]
pub enum Redemption {
    /// The token was live and is now consumed.
    Redeemed(UserSession),
    /// The token was already consumed or revoked but has not expired.
    /// Seeing it again means it was copied.
    Replayed { user_id: DbId },
    /// Unknown or expired.
    Invalid,
}

pub struct SessionRepo;

impl SessionRepo {
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<UserSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions (user_id, refresh_token_hash, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Consume the session for `hash`.
    ///
    /// The revoke and the liveness check are one statement, so two requests
    /// racing with the same token cannot both redeem it.
    pub async fn redeem(pool: &PgPool, hash: &str) -> Result<Redemption, sqlx::Error> {
        let query = format!(
            "UPDATE user_sessions SET is_revoked = true
             WHERE refresh_token_hash = $1
               AND is_revoked = false
               AND expires_at > NOW()
             RETURNING {COLUMNS}"
        );
        if let Some(session) = sqlx::query_as::<_, UserSession>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await?
        {
            return Ok(Redemption::Redeemed(session));
        }

        let spent: Option<DbId> = sqlx::query_scalar(
            "SELECT user_id FROM user_sessions
             WHERE refresh_token_hash = $1 AND is_revoked AND expires_at > NOW()",
        )
        .bind(hash)
        .fetch_optional(pool)
        .await?;

        Ok(match spent {
            Some(user_id) => Redemption::Replayed { user_id },
            None => Redemption::Invalid,
        })
    }

    /// Revoke every live session of a user. Returns how many were revoked.
    pub async fn revoke_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_revoked = true
             WHERE user_id = $1 AND is_revoked = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete expired sessions, and revoked ones last touched before
    /// `revoked_before`. Recently revoked rows are kept so replays of a
    /// consumed token are still recognised.
    pub async fn purge(pool: &PgPool, revoked_before: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_sessions
             WHERE expires_at < NOW() OR (is_revoked AND updated_at < $1)",
        )
        .bind(revoked_before)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
