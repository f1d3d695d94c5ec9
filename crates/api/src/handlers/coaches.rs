//! Handlers for the `/coaches` resource and its time slots.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use clubhouse_core::error::CoreError;
use clubhouse_core::pricing::{normalize_currency, validate_amount};
use clubhouse_core::schedule::{is_bookable, overlaps, validate_slot};
use clubhouse_core::types::{DbId, Timestamp};
use clubhouse_db::models::coach::{
    Coach, CoachSlot, CoachSlotAvailability, CreateCoach, CreateCoachSlot, SlotFilter,
    UpdateCoach,
};
use clubhouse_db::repositories::{CoachRepo, CoachSlotRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /coaches`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCoachRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub specialty: Option<String>,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub bio: Option<String>,
    pub hourly_rate_cents: i64,
    pub currency: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub image_url: Option<String>,
}

/// Request body for `PUT /coaches/{id}`. All fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCoachRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub specialty: Option<String>,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub bio: Option<String>,
    pub hourly_rate_cents: Option<i64>,
    pub currency: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Query parameters for `GET /coaches/{id}/slots`.
#[derive(Debug, Default, Deserialize)]
pub struct SlotQuery {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    #[serde(default)]
    pub include_booked: bool,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Coach",
        id,
    })
}

/// Load a coach visible to the caller. Inactive coaches are admin-only.
async fn visible_coach(state: &AppState, user: Option<&AuthUser>, id: DbId) -> AppResult<Coach> {
    CoachRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|c| c.is_active || user.is_some_and(AuthUser::is_admin))
        .ok_or_else(|| not_found(id))
}

/// GET /api/v1/coaches
///
/// `?include_inactive=true` only has an effect for admins.
pub async fn list(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<Coach>>>> {
    let include_inactive = params.include_inactive && user.is_some_and(|u| u.is_admin());
    let coaches = CoachRepo::list(&state.pool, include_inactive).await?;
    Ok(Json(DataResponse { data: coaches }))
}

/// GET /api/v1/coaches/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Coach>>> {
    let coach = visible_coach(&state, user.as_ref(), id).await?;
    Ok(Json(DataResponse { data: coach }))
}

/// POST /api/v1/coaches
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateCoachRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Coach>>)> {
    input.validate()?;
    validate_amount(input.hourly_rate_cents)?;
    let currency = input.currency.as_deref().map(normalize_currency).transpose()?;

    let coach = CoachRepo::create(
        &state.pool,
        &CreateCoach {
            name: input.name.trim().to_string(),
            specialty: input.specialty,
            bio: input.bio,
            hourly_rate_cents: input.hourly_rate_cents,
            currency,
            image_url: input.image_url,
        },
    )
    .await?;

    tracing::info!(coach_id = coach.id, admin_id = admin.user_id, "Coach created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: coach })))
}

/// PUT /api/v1/coaches/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCoachRequest>,
) -> AppResult<Json<DataResponse<Coach>>> {
    input.validate()?;
    if let Some(rate) = input.hourly_rate_cents {
        validate_amount(rate)?;
    }
    let currency = input.currency.as_deref().map(normalize_currency).transpose()?;

    let coach = CoachRepo::update(
        &state.pool,
        id,
        &UpdateCoach {
            name: input.name.map(|n| n.trim().to_string()),
            specialty: input.specialty,
            bio: input.bio,
            hourly_rate_cents: input.hourly_rate_cents,
            currency,
            image_url: input.image_url,
            is_active: input.is_active,
        },
    )
    .await?
    .ok_or_else(|| not_found(id))?;

    tracing::info!(coach_id = id, admin_id = admin.user_id, "Coach updated");
    Ok(Json(DataResponse { data: coach }))
}

/// DELETE /api/v1/coaches/{id}
///
/// Deactivates the coach; slots and bookings are kept.
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if CoachRepo::deactivate(&state.pool, id).await? {
        tracing::info!(coach_id = id, admin_id = admin.user_id, "Coach deactivated");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// GET /api/v1/coaches/{id}/slots
///
/// Upcoming slots. Booked ones are hidden unless `include_booked=true`.
pub async fn list_slots(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<DbId>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<DataResponse<Vec<CoachSlotAvailability>>>> {
    visible_coach(&state, user.as_ref(), id).await?;
    let slots = CoachSlotRepo::list_for_coach(
        &state.pool,
        id,
        &SlotFilter {
            from: query.from,
            to: query.to,
            include_booked: query.include_booked,
        },
    )
    .await?;
    Ok(Json(DataResponse { data: slots }))
}

/// POST /api/v1/coaches/{id}/slots
pub async fn create_slot(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<CreateCoachSlot>,
) -> AppResult<(StatusCode, Json<DataResponse<CoachSlot>>)> {
    validate_slot(input.starts_at, input.ends_at)?;
    if !is_bookable(input.starts_at, Utc::now()) {
        return Err(AppError::Core(CoreError::Validation(
            "Slot must start in the future".into(),
        )));
    }
    CoachRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    // The exclusion constraint is the real guard; this gives a clearer message.
    let upcoming = CoachSlotRepo::list_for_coach(
        &state.pool,
        id,
        &SlotFilter {
            include_booked: true,
            ..SlotFilter::default()
        },
    )
    .await?;
    if let Some(clash) = upcoming.iter().find(|s| {
        overlaps(input.starts_at, input.ends_at, s.slot.starts_at, s.slot.ends_at)
    }) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Slot overlaps existing slot {} ({} - {})",
            clash.slot.id, clash.slot.starts_at, clash.slot.ends_at
        ))));
    }

    let slot = CoachSlotRepo::create(&state.pool, id, &input).await?;
    tracing::info!(slot_id = slot.id, coach_id = id, admin_id = admin.user_id, "Coach slot created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: slot })))
}

/// DELETE /api/v1/coaches/{id}/slots/{slot_id}
///
/// Slots that were ever booked are kept for booking history (409).
pub async fn delete_slot(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((id, slot_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    if CoachSlotRepo::delete_unbooked(&state.pool, id, slot_id).await? {
        tracing::info!(slot_id, coach_id = id, admin_id = admin.user_id, "Coach slot deleted");
        return Ok(StatusCode::NO_CONTENT);
    }

    match CoachSlotRepo::find_by_id(&state.pool, slot_id).await? {
        Some(slot) if slot.coach_id == id => Err(AppError::Core(CoreError::Conflict(
            "Slot has bookings and cannot be deleted".into(),
        ))),
        _ => Err(AppError::Core(CoreError::NotFound {
            entity: "CoachSlot",
            id: slot_id,
        })),
    }
}
