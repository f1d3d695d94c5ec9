//! Error type for repository operations that enforce domain rules.
//!
//! Plain CRUD repositories return `sqlx::Error` directly. Operations that
//! lock rows and check invariants (capacity, slot ownership, status
//! transitions) return [`RepoError`] so the domain reason survives.

use clubhouse_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The database failed.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
