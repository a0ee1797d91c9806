use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use flyeasy_store::redis_repo::rate_limit_key;

pub mod auth;
pub mod bookings;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod flights;
pub mod middleware;
pub mod payments;
pub mod routes;
pub mod schedules;
pub mod state;
pub mod users;

pub use state::{AppState, AuthConfig};

const RATE_LIMIT_WINDOW_SECONDS: i64 = 60;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", auth::routes(state.clone()))
        .nest("/api/users", users::routes(state.clone()))
        .nest("/api/routes", routes::routes(state.clone()))
        .nest("/api/flights", flights::routes(state.clone()))
        .nest("/api/schedules", schedules::routes(state.clone()))
        .nest("/api/bookings", bookings::routes(state.clone()))
        .nest("/api/payments", payments::routes(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "success": true, "status": "ok" }))
}

/// Per-IP fixed window. Fails open when Redis is unreachable or unset.
async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(redis) = state.redis.as_ref() else {
        return next.run(req).await;
    };
    let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>().copied() else {
        return next.run(req).await;
    };

    let key = rate_limit_key(&addr.ip().to_string());
    let limit = state.business_rules.rate_limit_per_minute;
    match redis.check_rate_limit(&key, limit, RATE_LIMIT_WINDOW_SECONDS).await {
        Ok(true) => next.run(req).await,
        Ok(false) => (
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            Json(envelope::ErrorBody {
                success: false,
                error: "Too many requests, please try again later".to_string(),
                kind: "rate_limited",
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Rate limiter unavailable, allowing request: {}", e);
            next.run(req).await
        }
    }
}
