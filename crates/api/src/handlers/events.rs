//! Handlers for the `/events` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clubhouse_core::error::CoreError;
use clubhouse_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use clubhouse_core::pricing::{normalize_currency, validate_amount};
use clubhouse_core::schedule::validate_window;
use clubhouse_core::types::{DbId, Timestamp};
use clubhouse_db::models::booking::{Booking, NewEventBooking};
use clubhouse_db::models::event::{
    CreateEvent, Event, EventFilter, EventWithAvailability, UpdateEvent,
};
use clubhouse_db::repositories::{BookingRepo, EventRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /events`.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsParams {
    /// Only events that have not started yet (default `true`).
    pub upcoming: Option<bool>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub category: Option<String>,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub location: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    #[validate(range(min = 1, max = 100000, message = "must be between 1 and 100000"))]
    pub capacity: i32,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub image_url: Option<String>,
    pub is_published: Option<bool>,
}

/// Request body for `PUT /events/{id}`. All fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub category: Option<String>,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub location: Option<String>,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    #[validate(range(min = 1, max = 100000, message = "must be between 1 and 100000"))]
    pub capacity: Option<i32>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub image_url: Option<String>,
    pub is_published: Option<bool>,
}

/// An event as shown to members: registration count plus seats left.
#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: EventWithAvailability,
    pub spots_left: i64,
}

impl From<EventWithAvailability> for EventView {
    fn from(event: EventWithAvailability) -> Self {
        let spots_left = event.spots_left();
        Self { event, spots_left }
    }
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Event",
        id,
    })
}

/// GET /api/v1/events
///
/// Published events in start order. Admins also see unpublished ones.
pub async fn list(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(params): Query<ListEventsParams>,
) -> AppResult<Json<DataResponse<Vec<EventView>>>> {
    let filter = EventFilter {
        upcoming_only: params.upcoming.unwrap_or(true),
        category: params
            .category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty()),
        include_unpublished: user.is_some_and(|u| u.is_admin()),
        limit: clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT),
        offset: clamp_offset(params.offset),
    };
    let events = EventRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse {
        data: events.into_iter().map(EventView::from).collect(),
    }))
}

/// GET /api/v1/events/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<EventView>>> {
    let event = EventRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|e| e.event.is_published || user.as_ref().is_some_and(AuthUser::is_admin))
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: event.into() }))
}

/// POST /api/v1/events
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Event>>)> {
    input.validate()?;
    validate_window(input.starts_at, input.ends_at)?;
    if let Some(price) = input.price_cents {
        validate_amount(price)?;
    }
    let currency = input.currency.as_deref().map(normalize_currency).transpose()?;

    let event = EventRepo::create(
        &state.pool,
        &CreateEvent {
            title: input.title.trim().to_string(),
            description: input.description,
            category: input.category.map(|c| c.trim().to_lowercase()),
            location: input.location,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            capacity: input.capacity,
            price_cents: input.price_cents,
            currency,
            image_url: input.image_url,
            is_published: input.is_published,
        },
    )
    .await?;

    tracing::info!(event_id = event.id, admin_id = admin.user_id, "Event created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// PUT /api/v1/events/{id}
///
/// The merged schedule must stay valid and the capacity may not drop below
/// the seats already taken.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateEventRequest>,
) -> AppResult<Json<DataResponse<Event>>> {
    input.validate()?;
    let current = EventRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    validate_window(
        input.starts_at.unwrap_or(current.event.starts_at),
        input.ends_at.unwrap_or(current.event.ends_at),
    )?;
    if let Some(price) = input.price_cents {
        validate_amount(price)?;
    }
    let currency = input.currency.as_deref().map(normalize_currency).transpose()?;

    let event = EventRepo::update(
        &state.pool,
        id,
        &UpdateEvent {
            title: input.title.map(|t| t.trim().to_string()),
            description: input.description,
            category: input.category.map(|c| c.trim().to_lowercase()),
            location: input.location,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            capacity: input.capacity,
            price_cents: input.price_cents,
            currency,
            image_url: input.image_url,
            is_published: input.is_published,
        },
    )
    .await?
    .ok_or_else(|| not_found(id))?;

    tracing::info!(event_id = id, admin_id = admin.user_id, "Event updated");
    Ok(Json(DataResponse { data: event }))
}

/// DELETE /api/v1/events/{id}
///
/// Events with bookings are kept (409); unpublish them instead.
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if EventRepo::delete(&state.pool, id).await? {
        tracing::info!(event_id = id, admin_id = admin.user_id, "Event deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// POST /api/v1/events/{id}/register
///
/// Book a seat for the caller. Free events are confirmed immediately; paid
/// ones stay pending until checkout completes.
pub async fn register(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<Booking>>)> {
    let booking = BookingRepo::create_event_booking(
        &state.pool,
        &NewEventBooking {
            user_id: user.user_id,
            event_id: id,
            notes: None,
        },
    )
    .await?;

    tracing::info!(
        booking_id = booking.id,
        event_id = id,
        user_id = user.user_id,
        status = %booking.status,
        "Event booked"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: booking })))
}
