//! Well-known role name constants.
//!
//! These must match the seed data in `20250301000001_create_roles_and_users.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MEMBER: &str = "member";

/// Role id assigned to self-registered and OAuth users.
pub const DEFAULT_ROLE_ID: i64 = 2;
