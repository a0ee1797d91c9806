use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use flyeasy_core::models::BookingStatus;
use flyeasy_core::repository::BookingFilter;
use flyeasy_core::Actor;
use flyeasy_order::{BookingView, CreateBookingRequest, RescheduleRequest};

use crate::envelope::{self, Envelope};
use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth_middleware;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
    pub flight: Option<Uuid>,
}

impl From<BookingQuery> for BookingFilter {
    fn from(query: BookingQuery) -> Self {
        BookingFilter {
            status: query.status,
            flight_id: query.flight,
            ..Default::default()
        }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route("/my-bookings", get(my_bookings))
        .route("/{id}", get(get_booking))
        .route("/{id}/cancel", put(cancel_booking))
        .route("/{id}/reschedule", put(reschedule_booking))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

/// POST /api/bookings
async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppJson(req): AppJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Envelope<BookingView>>), AppError> {
    let view = state.bookings.create_booking(&actor, req).await?;
    Ok(envelope::created(view))
}

/// GET /api/bookings
/// Admins see all bookings, everyone else their own.
async fn list_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppQuery(query): AppQuery<BookingQuery>,
) -> Result<Json<Envelope<Vec<BookingView>>>, AppError> {
    let bookings = state.bookings.list_bookings(&actor, query.into()).await?;
    Ok(envelope::list(bookings))
}

/// GET /api/bookings/my-bookings
async fn my_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Envelope<Vec<BookingView>>>, AppError> {
    Ok(envelope::list(state.bookings.my_bookings(&actor).await?))
}

/// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Envelope<BookingView>>, AppError> {
    Ok(envelope::ok(state.bookings.get_booking(&actor, id).await?))
}

/// PUT /api/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Envelope<BookingView>>, AppError> {
    Ok(envelope::ok(state.bookings.cancel_booking(&actor, id).await?))
}

/// PUT /api/bookings/{id}/reschedule
async fn reschedule_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<RescheduleRequest>,
) -> Result<Json<Envelope<BookingView>>, AppError> {
    Ok(envelope::ok(
        state
            .bookings
            .reschedule_booking(&actor, id, req.new_flight_id)
            .await?,
    ))
}
