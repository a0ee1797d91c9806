use axum::{
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use flyeasy_catalog::{FlightStatusView, FlightUpdate, FlightView, NewFlight};
use flyeasy_core::models::{Flight, FlightStatus};
use flyeasy_core::repository::FlightFilter;

use crate::envelope::{self, Envelope};
use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::{admin_middleware, auth_middleware};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FlightQuery {
    pub status: Option<FlightStatus>,
    pub route: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl From<FlightQuery> for FlightFilter {
    fn from(query: FlightQuery) -> Self {
        FlightFilter {
            status: query.status,
            route_ids: query.route.map(|id| vec![id]),
            departure_from: query.from,
            departure_to: query.to,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: FlightStatus,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_flight))
        .route("/{id}", put(update_flight).delete(delete_flight))
        .route("/{id}/status", put(update_flight_status))
        .route_layer(from_fn(admin_middleware))
        .route_layer(from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/", get(list_flights))
        .route("/status/{code}", get(flight_status))
        .route("/{id}", get(get_flight))
        .merge(admin)
}

/// GET /api/flights
/// Sorted by departure time.
async fn list_flights(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<FlightQuery>,
) -> Result<Json<Envelope<Vec<FlightView>>>, AppError> {
    let flights = state.network.list_flights(&query.into()).await?;
    Ok(envelope::list(flights))
}

/// GET /api/flights/{id}
async fn get_flight(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Envelope<FlightView>>, AppError> {
    Ok(envelope::ok(state.network.get_flight(id).await?))
}

/// GET /api/flights/status/{code}
async fn flight_status(
    State(state): State<AppState>,
    AppPath(code): AppPath<String>,
) -> Result<Json<Envelope<FlightStatusView>>, AppError> {
    Ok(envelope::ok(state.network.flight_status(&code).await?))
}

/// POST /api/flights
async fn create_flight(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewFlight>,
) -> Result<(StatusCode, Json<Envelope<Flight>>), AppError> {
    Ok(envelope::created(state.network.create_flight(req).await?))
}

/// PUT /api/flights/{id}
async fn update_flight(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<FlightUpdate>,
) -> Result<Json<Envelope<FlightView>>, AppError> {
    Ok(envelope::ok(state.network.update_flight(id, req).await?))
}

/// PUT /api/flights/{id}/status
async fn update_flight_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<StatusUpdate>,
) -> Result<Json<Envelope<Flight>>, AppError> {
    Ok(envelope::ok(
        state.network.update_flight_status(id, req.status).await?,
    ))
}

/// DELETE /api/flights/{id}
/// Refused once departed or while bookings are active.
async fn delete_flight(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Envelope<serde_json::Value>>, AppError> {
    state.network.delete_flight(id).await?;
    Ok(envelope::empty())
}
