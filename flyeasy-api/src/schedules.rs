use axum::{
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use flyeasy_catalog::{FlightUpdate, FlightView, NewSchedule, ScheduleOutcome, SchedulePage, ScheduleQuery};

use crate::envelope::{self, Envelope};
use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::{admin_middleware, auth_middleware};
use crate::state::AppState;

/// Paged listings carry their pagination beside `data`.
#[derive(Debug, Serialize)]
pub struct PageEnvelope {
    success: bool,
    #[serde(flatten)]
    page: SchedulePage,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_schedule))
        .route("/{id}", put(update_schedule).delete(delete_schedule))
        .route_layer(from_fn(admin_middleware))
        .route_layer(from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/", get(list_schedules))
        .route("/{id}", get(get_schedule))
        .merge(admin)
}

/// GET /api/schedules?page=&limit=&origin=&destination=
async fn list_schedules(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ScheduleQuery>,
) -> Result<Json<PageEnvelope>, AppError> {
    let page = state.schedules.list(&query).await?;
    Ok(Json(PageEnvelope {
        success: true,
        page,
    }))
}

/// GET /api/schedules/{id}
async fn get_schedule(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Envelope<FlightView>>, AppError> {
    Ok(envelope::ok(state.schedules.get(id).await?))
}

/// POST /api/schedules
/// With `recurringDays` this also creates the weekly recurrences.
async fn create_schedule(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewSchedule>,
) -> Result<(StatusCode, Json<Envelope<ScheduleOutcome>>), AppError> {
    Ok(envelope::created(state.schedules.create(req).await?))
}

/// PUT /api/schedules/{id}
async fn update_schedule(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<FlightUpdate>,
) -> Result<Json<Envelope<FlightView>>, AppError> {
    Ok(envelope::ok(state.schedules.update(id, req).await?))
}

/// DELETE /api/schedules/{id}
async fn delete_schedule(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Envelope<serde_json::Value>>, AppError> {
    state.schedules.delete(id).await?;
    Ok(envelope::empty())
}
