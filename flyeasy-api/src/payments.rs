use axum::{
    extract::State, middleware::from_fn_with_state, routing::post, Extension, Json, Router,
};
use uuid::Uuid;

use flyeasy_core::Actor;
use flyeasy_order::CheckoutResult;

use crate::envelope::{self, Envelope};
use crate::error::AppError;
use crate::extract::AppPath;
use crate::middleware::auth_middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/checkout/{booking_id}", post(checkout))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

/// POST /api/payments/checkout/{bookingId}
/// Settles the booking total through the payment gateway in one step.
async fn checkout(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppPath(booking_id): AppPath<Uuid>,
) -> Result<Json<Envelope<CheckoutResult>>, AppError> {
    Ok(envelope::ok(
        state.bookings.pay_booking(&actor, booking_id).await?,
    ))
}
