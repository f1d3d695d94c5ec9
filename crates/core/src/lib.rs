//! Clubhouse domain core.
//!
//! Pure domain logic with no IO: identifiers, errors, role names, booking
//! and payment state machines, pricing, scheduling windows, and input
//! normalization. Shared by the database, payments, and API crates.

pub mod booking;
pub mod error;
pub mod pagination;
pub mod pricing;
pub mod roles;
pub mod schedule;
pub mod text;
pub mod types;
