//! Handler for the public contact form.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use clubhouse_core::text::{normalize_email, normalize_name, validate_email};
use clubhouse_db::models::contact_message::{ContactMessage, CreateContactMessage};
use clubhouse_db::repositories::ContactMessageRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /contact`.
#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: String,
    pub email: String,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "must be between 1 and 5000 characters"))]
    pub message: String,
}

/// POST /api/v1/contact
pub async fn submit(
    State(state): State<AppState>,
    Json(input): Json<ContactRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ContactMessage>>)> {
    input.validate()?;
    let email = normalize_email(&input.email);
    validate_email(&email)?;

    let message = ContactMessageRepo::create(
        &state.pool,
        &CreateContactMessage {
            name: normalize_name(&input.name),
            email,
            subject: input.subject.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            message: input.message.trim().to_string(),
        },
    )
    .await?;

    tracing::info!(message_id = message.id, "Contact message received");
    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}
