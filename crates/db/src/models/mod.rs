//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod booking;
pub mod coach;
pub mod contact_message;
pub mod dashboard;
pub mod event;
pub mod payment;
pub mod role;
pub mod session;
pub mod user;
