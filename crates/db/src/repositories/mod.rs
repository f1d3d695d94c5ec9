//! Repository layer: zero-sized structs with async query methods.
//!
//! Simple CRUD methods take `&PgPool`; multi-row writes that must be atomic
//! take `&mut PgConnection` so callers can compose them in one transaction.

pub mod booking_repo;
pub mod coach_repo;
pub mod coach_slot_repo;
pub mod contact_message_repo;
pub mod dashboard_repo;
pub mod event_repo;
pub mod payment_repo;
pub mod role_repo;
pub mod session_repo;
pub mod user_repo;
pub mod webhook_event_repo;

pub use booking_repo::BookingRepo;
pub use coach_repo::CoachRepo;
pub use coach_slot_repo::CoachSlotRepo;
pub use contact_message_repo::ContactMessageRepo;
pub use dashboard_repo::DashboardRepo;
pub use event_repo::EventRepo;
pub use payment_repo::PaymentRepo;
pub use role_repo::RoleRepo;
pub use session_repo::{Redemption, SessionRepo};
pub use user_repo::UserRepo;
pub use webhook_event_repo::WebhookEventRepo;
