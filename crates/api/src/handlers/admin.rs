//! Admin console handlers (`/admin/*`). Every handler requires the `admin` role.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clubhouse_core::booking::{validate_kind, validate_status};
use clubhouse_core::error::CoreError;
use clubhouse_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use clubhouse_core::text::normalize_name;
use clubhouse_core::types::DbId;
use clubhouse_db::models::booking::{Booking, BookingDetail, BookingFilter};
use clubhouse_db::models::contact_message::ContactMessage;
use clubhouse_db::models::dashboard::DashboardStats;
use clubhouse_db::models::user::{UpdateUser, UserResponse};
use clubhouse_db::repositories::{
    BookingRepo, ContactMessageRepo, DashboardRepo, RoleRepo, SessionRepo, UserRepo,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::payments::expire_closed_checkouts;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `PUT /admin/users/{id}`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub full_name: Option<String>,
    #[validate(length(max = 40, message = "must be at most 40 characters"))]
    pub phone: Option<String>,
    /// Role name (`admin` or `member`).
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// Request body for `PUT /admin/bookings/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactListParams {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn user_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "User", id })
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<DashboardStats>>> {
    let stats = DashboardRepo::stats(&state.pool).await?;
    Ok(Json(DataResponse { data: stats }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let (limit, offset) = params.clamped();
    let users = UserRepo::list(&state.pool, limit, offset).await?;
    let roles: HashMap<DbId, String> = RoleRepo::list(&state.pool)
        .await?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();

    let data = users
        .iter()
        .map(|u| {
            let role = roles.get(&u.role_id).cloned().unwrap_or_default();
            UserResponse::from_user(u, role)
        })
        .collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from_user(&user, role),
    }))
}

/// PUT /api/v1/admin/users/{id}
///
/// Admins cannot demote or deactivate themselves. Deactivating a user also
/// revokes their refresh sessions.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<AdminUpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    input.validate()?;

    let role_id = match input.role.as_deref() {
        Some(name) => Some(
            RoleRepo::id_for_name(&state.pool, name.trim())
                .await?
                .ok_or_else(|| {
                    AppError::Core(CoreError::Validation(format!("Unknown role '{name}'")))
                })?,
        ),
        None => None,
    };

    if id == admin.user_id
        && (input.is_active == Some(false)
            || input.role.as_deref().is_some_and(|r| r.trim() != admin.role))
    {
        return Err(AppError::Core(CoreError::Conflict(
            "Admins cannot deactivate or demote themselves".into(),
        )));
    }

    let user = UserRepo::update(
        &state.pool,
        id,
        &UpdateUser {
            full_name: input.full_name.as_deref().map(normalize_name),
            phone: input.phone.map(|p| p.trim().to_string()),
            role_id,
            is_active: input.is_active,
        },
    )
    .await?
    .ok_or_else(|| user_not_found(id))?;

    if !user.is_active {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }

    tracing::info!(user_id = id, admin_id = admin.user_id, "User updated by admin");
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from_user(&user, role),
    }))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Deactivates the account (bookings and payments reference it) and revokes
/// its sessions.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::Core(CoreError::Conflict(
            "Admins cannot deactivate themselves".into(),
        )));
    }
    if !UserRepo::deactivate(&state.pool, id).await? {
        return Err(user_not_found(id));
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    tracing::info!(user_id = id, admin_id = admin.user_id, "User deactivated");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/bookings
///
/// Filters: `status`, `kind`, `user_id`, `limit`, `offset`.
pub async fn list_bookings(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<BookingFilter>,
) -> AppResult<Json<DataResponse<Vec<BookingDetail>>>> {
    if let Some(status) = &filter.status {
        validate_status(status)?;
    }
    if let Some(kind) = &filter.kind {
        validate_kind(kind)?;
    }
    let limit = clamp_limit(filter.limit, DEFAULT_LIMIT, MAX_LIMIT);
    let offset = clamp_offset(filter.offset);
    let bookings = BookingRepo::list(&state.pool, &filter, limit, offset).await?;
    Ok(Json(DataResponse { data: bookings }))
}

/// PUT /api/v1/admin/bookings/{id}/status
pub async fn update_booking_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateBookingStatusRequest>,
) -> AppResult<Json<DataResponse<Booking>>> {
    let status = input.status.trim().to_lowercase();
    let change = BookingRepo::update_status(&state.pool, id, &status).await?;

    tracing::info!(
        booking_id = id,
        admin_id = admin.user_id,
        status = %change.booking.status,
        "Booking status changed by admin"
    );
    expire_closed_checkouts(&state, &change.closed_checkouts).await;

    let booking = BookingRepo::find_by_id(&state.pool, id)
        .await?
        .unwrap_or(change.booking);
    Ok(Json(DataResponse { data: booking }))
}

// ---------------------------------------------------------------------------
// Contact messages
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/contact-messages
pub async fn list_contact_messages(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<ContactListParams>,
) -> AppResult<Json<DataResponse<Vec<ContactMessage>>>> {
    let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
    let offset = clamp_offset(params.offset);
    let messages =
        ContactMessageRepo::list(&state.pool, params.unread_only, limit, offset).await?;
    Ok(Json(DataResponse { data: messages }))
}

/// PUT /api/v1/admin/contact-messages/{id}/read
pub async fn mark_contact_message_read(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ContactMessage>>> {
    let message = ContactMessageRepo::mark_read(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ContactMessage",
            id,
        }))?;
    Ok(Json(DataResponse { data: message }))
}

/// DELETE /api/v1/admin/contact-messages/{id}
pub async fn delete_contact_message(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ContactMessageRepo::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "ContactMessage",
            id,
        }))
    }
}
