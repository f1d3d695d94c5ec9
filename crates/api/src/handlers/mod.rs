//! Request handlers, one submodule per resource.
//!
//! Handlers validate input, delegate to the repositories in `clubhouse_db`,
//! and map errors through [`AppError`](crate::error::AppError).

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod coaches;
pub mod contact;
pub mod events;
pub mod oauth;
pub mod payments;
pub mod users;
