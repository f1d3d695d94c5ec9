//! Handlers for the `/bookings` resource (the caller's own bookings).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use clubhouse_core::booking::{validate_kind, KIND_COACH, KIND_EVENT};
use clubhouse_core::error::CoreError;
use clubhouse_core::types::DbId;
use clubhouse_db::models::booking::{Booking, BookingDetail, NewCoachBooking, NewEventBooking};
use clubhouse_db::repositories::BookingRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::payments::expire_closed_checkouts;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /bookings`.
///
/// `kind` selects which of `event_id` / `coach_slot_id` must be present.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub kind: String,
    pub event_id: Option<DbId>,
    pub coach_slot_id: Option<DbId>,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub notes: Option<String>,
}

pub(crate) fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Booking",
        id,
    })
}

/// GET /api/v1/bookings
pub async fn list_mine(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<BookingDetail>>>> {
    let bookings = BookingRepo::list_for_user(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: bookings }))
}

/// POST /api/v1/bookings
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Booking>>)> {
    input.validate()?;
    validate_kind(&input.kind)?;
    let notes = input.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

    let booking = match (input.kind.as_str(), input.event_id, input.coach_slot_id) {
        (KIND_EVENT, Some(event_id), None) => {
            BookingRepo::create_event_booking(
                &state.pool,
                &NewEventBooking {
                    user_id: user.user_id,
                    event_id,
                    notes,
                },
            )
            .await?
        }
        (KIND_COACH, None, Some(coach_slot_id)) => {
            BookingRepo::create_coach_booking(
                &state.pool,
                &NewCoachBooking {
                    user_id: user.user_id,
                    coach_slot_id,
                    notes,
                },
            )
            .await?
        }
        (KIND_EVENT, ..) => {
            return Err(AppError::Core(CoreError::Validation(
                "An event booking needs event_id and no coach_slot_id".into(),
            )))
        }
        _ => {
            return Err(AppError::Core(CoreError::Validation(
                "A coach booking needs coach_slot_id and no event_id".into(),
            )))
        }
    };

    tracing::info!(
        booking_id = booking.id,
        user_id = user.user_id,
        kind = %booking.kind,
        status = %booking.status,
        amount_cents = booking.amount_cents,
        "Booking created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: booking })))
}

/// GET /api/v1/bookings/{id}
///
/// Visible to the booking's owner and to admins.
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BookingDetail>>> {
    let booking = BookingRepo::find_detail(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    user.ensure_owner_or_admin(booking.booking.user_id)?;
    Ok(Json(DataResponse { data: booking }))
}

/// POST /api/v1/bookings/{id}/cancel
///
/// Releases the seat or slot and expires any checkout still open for it. A
/// paid booking stays `paid` after cancelling and is counted as a refund due.
pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Booking>>> {
    let booking = BookingRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    user.ensure_owner_or_admin(booking.user_id)?;

    let change = BookingRepo::cancel(&state.pool, id).await?;
    tracing::info!(
        booking_id = id,
        user_id = user.user_id,
        payment_status = %change.booking.payment_status,
        "Booking cancelled"
    );
    expire_closed_checkouts(&state, &change.closed_checkouts).await;

    let cancelled = BookingRepo::find_by_id(&state.pool, id)
        .await?
        .unwrap_or(change.booking);
    Ok(Json(DataResponse { data: cancelled }))
}
