//! User entity model and DTOs.

use clubhouse_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Auth provider value for email + password accounts.
pub const PROVIDER_LOCAL: &str = "local";

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    /// `None` for accounts created through an OAuth provider.
    pub password_hash: Option<String>,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role_id: DbId,
    pub auth_provider: String,
    pub provider_user_id: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    /// Resolved role name (e.g. `"admin"`, `"member"`).
    pub role: String,
    pub role_id: DbId,
    pub auth_provider: String,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl UserResponse {
    /// Build the safe representation from a row and a pre-resolved role name.
    pub fn from_user(user: &User, role: String) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            avatar_url: user.avatar_url.clone(),
            role,
            role_id: user.role_id,
            auth_provider: user.auth_provider.clone(),
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Must already be normalized (trimmed, lowercase).
    pub email: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role_id: DbId,
    pub auth_provider: String,
    pub provider_user_id: Option<String>,
}

/// DTO for admin updates of an existing user. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role_id: Option<DbId>,
    pub is_active: Option<bool>,
}

/// DTO for a member editing their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}
