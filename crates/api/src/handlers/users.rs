//! Handlers for the caller's own profile (`/users/me`).

use axum::extract::State;
use axum::Json;
use clubhouse_core::error::CoreError;
use clubhouse_core::text::normalize_name;
use clubhouse_db::models::user::{UpdateProfile, UserResponse};
use clubhouse_db::repositories::{RoleRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub full_name: Option<String>,
    #[validate(length(max = 40, message = "must be at most 40 characters"))]
    pub phone: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub avatar_url: Option<String>,
}

fn gone() -> AppError {
    AppError::Core(CoreError::Unauthorized("User no longer exists".into()))
}

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let row = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(gone)?;
    let role = RoleRepo::resolve_name(&state.pool, row.role_id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from_user(&row, role),
    }))
}

/// PUT /api/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<UpdateProfileRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    input.validate()?;
    let full_name = input.full_name.as_deref().map(normalize_name);
    if full_name.as_deref() == Some("") {
        return Err(AppError::Core(CoreError::Validation(
            "full_name must not be blank".into(),
        )));
    }

    let row = UserRepo::update_profile(
        &state.pool,
        user.user_id,
        &UpdateProfile {
            full_name,
            phone: input.phone.map(|p| p.trim().to_string()),
            avatar_url: input.avatar_url,
        },
    )
    .await?
    .ok_or_else(gone)?;

    tracing::info!(user_id = user.user_id, "Profile updated");
    let role = RoleRepo::resolve_name(&state.pool, row.role_id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from_user(&row, role),
    }))
}
