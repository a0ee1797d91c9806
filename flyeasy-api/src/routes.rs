use axum::{
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use flyeasy_catalog::{NewRoute, RouteDetails, RouteUpdate};
use flyeasy_core::models::Route;
use flyeasy_core::repository::RouteFilter;

use crate::envelope::{self, Envelope};
use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::{admin_middleware, auth_middleware};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RouteQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub active: Option<bool>,
}

impl From<RouteQuery> for RouteFilter {
    fn from(query: RouteQuery) -> Self {
        RouteFilter {
            origin_code: query.origin,
            destination_code: query.destination,
            active_only: query.active.unwrap_or(false),
        }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_route))
        .route("/{id}", put(update_route).delete(delete_route))
        .route_layer(from_fn(admin_middleware))
        .route_layer(from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/", get(list_routes))
        .route("/{id}", get(get_route))
        .merge(admin)
}

/// GET /api/routes
async fn list_routes(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RouteQuery>,
) -> Result<Json<Envelope<Vec<Route>>>, AppError> {
    let routes = state.network.list_routes(&query.into()).await?;
    Ok(envelope::list(routes))
}

/// GET /api/routes/{id}
async fn get_route(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Envelope<RouteDetails>>, AppError> {
    Ok(envelope::ok(state.network.get_route(id).await?))
}

/// POST /api/routes
async fn create_route(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewRoute>,
) -> Result<(StatusCode, Json<Envelope<Route>>), AppError> {
    Ok(envelope::created(state.network.create_route(req).await?))
}

/// PUT /api/routes/{id}
async fn update_route(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<RouteUpdate>,
) -> Result<Json<Envelope<Route>>, AppError> {
    Ok(envelope::ok(state.network.update_route(id, req).await?))
}

/// DELETE /api/routes/{id}
async fn delete_route(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Envelope<serde_json::Value>>, AppError> {
    state.network.delete_route(id).await?;
    Ok(envelope::empty())
}
