//! Hosted-checkout payments.
//!
//! - [`provider`] -- the [`PaymentProvider`] seam the API talks to.
//! - [`stripe`] -- Stripe Checkout over its HTTP API.
//! - [`webhook`] -- webhook signature verification and event parsing.

pub mod error;
pub mod provider;
pub mod stripe;
pub mod webhook;

pub use error::PaymentError;
pub use provider::{CheckoutSession, CheckoutSessionRequest, PaymentProvider, Settlement};
