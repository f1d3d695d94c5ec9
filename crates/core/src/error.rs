use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Event {event_id} is full")]
    EventFull { event_id: DbId },

    #[error("Already registered for event {event_id}")]
    AlreadyRegistered { event_id: DbId },

    #[error("Coach slot {slot_id} is not available")]
    SlotUnavailable { slot_id: DbId },

    #[error("Internal error: {0}")]
    Internal(String),
}
