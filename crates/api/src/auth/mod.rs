//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT access tokens and refresh-token helpers.
//! - [`oauth`] -- Google / Facebook authorization-code sign-in.

pub mod jwt;
pub mod oauth;
pub mod password;
