//! Request extractors that authenticate and authorize callers.
//!
//! - [`auth::AuthUser`] -- the caller identified by a Bearer access token.
//! - [`rbac::RequireAdmin`] -- the caller must hold the `admin` role.
//! - [`rbac::RequireAuth`] -- any signed-in caller.

pub mod auth;
pub mod rbac;
