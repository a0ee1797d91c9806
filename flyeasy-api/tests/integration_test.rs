use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use flyeasy_api::{app, AppState, AuthConfig};
use flyeasy_core::SystemClock;
use flyeasy_store::app_config::BusinessRules;
use flyeasy_store::Repositories;

const ADMIN_EMAIL: &str = "admin@flyeasy.test";

fn test_app() -> Router {
    let state = AppState::new(
        Repositories::in_memory(),
        AuthConfig {
            secret: "integration-secret".to_string(),
            expiration: 3600,
            bootstrap_admin_email: Some(ADMIN_EMAIL.to_string()),
            bcrypt_cost: 4,
        },
        BusinessRules::default(),
        "INR",
        Arc::new(SystemClock),
    );
    app(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register(app: &Router, name: &str, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

/// Admin token plus a DEL-BOM route with flight FL100 (10 economy seats, 5000.00 fare).
async fn seed_network(app: &Router) -> (String, String, String) {
    let (admin, _) = register(app, "Admin", ADMIN_EMAIL).await;

    let (status, body) = send(
        app,
        Method::POST,
        "/api/routes",
        Some(&admin),
        Some(json!({
            "origin": { "code": "DEL", "city": "Delhi", "country": "India" },
            "destination": { "code": "BOM", "city": "Mumbai", "country": "India" },
            "distance": 1148.0,
            "estimatedDuration": 130
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let route_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app,
        Method::POST,
        "/api/flights",
        Some(&admin),
        Some(json!({
            "flightNumber": "FL100",
            "route": route_id,
            "aircraft": "A320",
            "departureTime": "2030-02-01T09:00:00Z",
            "arrivalTime": "2030-02-01T11:10:00Z",
            "price": { "economy": 5000, "business": 12000 },
            "seatsAvailable": { "economy": 10, "business": 2 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let flight_id = body["data"]["id"].as_str().unwrap().to_string();

    (admin, route_id, flight_id)
}

fn booking_body(flight_id: &str) -> Value {
    json!({
        "flightId": flight_id,
        "seatClass": "economy",
        "passengers": [
            { "name": "Asha Rao", "age": 34, "passportNumber": "P1000001" },
            { "name": "Vikram Rao", "age": 36, "passportNumber": "P1000002" },
            { "name": "Mira Rao", "age": 1, "passportNumber": "P1000003" }
        ],
        "contactDetails": { "email": "asha@example.com", "phone": "+91 98000 00000" },
        "paymentDetails": { "method": "credit-card" }
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_authentication_flow() {
    let app = test_app();
    let (token, user_id) = register(&app, "Asha", "Asha@Example.com").await;

    let (status, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["email"], "asha@example.com");
    assert_eq!(body["data"]["role"], "passenger");
    assert_eq!(body["data"]["preferences"]["theme"], "dark");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Asha", "email": "asha@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "asha@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "asha@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());

    let (status, body) = send(&app, Method::GET, "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn test_admin_rbac() {
    let app = test_app();
    let (passenger, passenger_id) = register(&app, "Ravi", "ravi@example.com").await;
    let (admin, _) = register(&app, "Admin", ADMIN_EMAIL).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/routes",
        Some(&passenger),
        Some(json!({
            "origin": { "code": "DEL", "city": "Delhi", "country": "India" },
            "destination": { "code": "BLR", "city": "Bangalore", "country": "India" },
            "distance": 1740.0,
            "estimatedDuration": 165
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");
    assert_eq!(
        body["error"],
        "User role passenger is not authorized to access this route"
    );

    let (status, _) = send(&app, Method::GET, "/api/users", Some(&passenger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, Method::GET, "/api/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    // Passengers cannot promote themselves.
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/users/{}", passenger_id),
        Some(&passenger),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/users/{}", passenger_id),
        Some(&passenger),
        Some(json!({ "name": "Ravi Kumar" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ravi Kumar");

    let (status, _) = send(&app, Method::GET, "/api/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_booking_lifecycle() {
    let app = test_app();
    let (_admin, route_id, flight_id) = seed_network(&app).await;
    let (passenger, passenger_id) = register(&app, "Asha", "asha@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&passenger),
        Some(booking_body(&flight_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let booking = &body["data"];
    let booking_id = booking["id"].as_str().unwrap().to_string();
    // 2 adults at 5000.00 plus an infant at 10%.
    assert_eq!(booking["totalPrice"], 10500.0);
    assert_eq!(booking["originalPrice"], 10500.0);
    assert_eq!(booking["discountApplied"], false);
    assert_eq!(booking["user"], passenger_id.as_str());
    assert_eq!(booking["flightDetails"]["route"]["id"], route_id.as_str());
    let reference = booking["bookingReference"].as_str().unwrap();
    assert_eq!(reference.len(), 6);
    assert!(reference.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    let (_, body) = send(&app, Method::GET, &format!("/api/flights/{}", flight_id), None, None).await;
    assert_eq!(body["data"]["seatsAvailable"]["economy"], 7);

    let (status, body) = send(&app, Method::GET, "/api/bookings/my-bookings", Some(&passenger), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    // Another passenger cannot see or cancel it.
    let (stranger, _) = register(&app, "Ravi", "ravi@example.com").await;
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/bookings/{}", booking_id),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/bookings/{}/cancel", booking_id),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Flights with active bookings cannot be deleted.
    let (_, admin_body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "secret123" })),
    )
    .await;
    let admin = admin_body["token"].as_str().unwrap().to_string();
    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/flights/{}", flight_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_state");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/bookings/{}/cancel", booking_id),
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");
    let cancelled_at = body["data"]["cancelledAt"].clone();
    assert!(!cancelled_at.is_null());

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/bookings/{}/cancel", booking_id),
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_state");
    assert_eq!(body["error"], "Booking is already cancelled");

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/bookings/{}", booking_id),
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(body["data"]["cancelledAt"], cancelled_at);

    let (_, body) = send(&app, Method::GET, &format!("/api/flights/{}", flight_id), None, None).await;
    assert_eq!(body["data"]["seatsAvailable"]["economy"], 10);

    // Rescheduling a cancelled booking fails whatever the target.
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/bookings/{}/reschedule", booking_id),
        Some(&passenger),
        Some(json!({ "newFlightId": flight_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_state");
}

#[tokio::test]
async fn test_checkout_settles_booking() {
    let app = test_app();
    let (_admin, _route_id, flight_id) = seed_network(&app).await;
    let (passenger, _) = register(&app, "Asha", "asha@example.com").await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&passenger),
        Some(booking_body(&flight_id)),
    )
    .await;
    let booking_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/payments/checkout/{}", booking_id),
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["booking"]["paymentStatus"], "completed");
    assert_eq!(body["data"]["payment"]["status"], "SUCCEEDED");
    assert_eq!(body["data"]["payment"]["amount"], 10500.0);
    assert_eq!(body["data"]["payment"]["currency"], "INR");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/payments/checkout/{}", booking_id),
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Booking is already paid");
}

#[tokio::test]
async fn test_routes_and_flights_stay_consistent() {
    let app = test_app();
    let (admin, route_id, flight_id) = seed_network(&app).await;

    let (_, body) = send(&app, Method::GET, &format!("/api/routes/{}", route_id), None, None).await;
    assert_eq!(body["data"]["activeFlights"], json!([flight_id]));
    assert_eq!(body["data"]["flights"][0]["flightNumber"], "FL100");

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/routes/{}", route_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot delete route with active flights");

    let (status, body) = send(&app, Method::GET, "/api/flights/status/FL100", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "scheduled");

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/flights/{}/status", flight_id),
        Some(&admin),
        Some(json!({ "status": "delayed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/flights/{}/status", flight_id),
        Some(&admin),
        Some(json!({ "status": "scheduled" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_state");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/flights/{}", flight_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/routes/{}", route_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::GET, &format!("/api/routes/{}", route_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_recurring_schedule_creation() {
    let app = test_app();
    let (admin, route_id, _) = seed_network(&app).await;

    // 2030-03-04 is a Monday.
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/schedules",
        Some(&admin),
        Some(json!({
            "routeId": route_id,
            "flightNumber": "FL300",
            "aircraft": "A321",
            "departureTime": "2030-03-04T06:00:00Z",
            "arrivalTime": "2030-03-04T08:10:00Z",
            "price": { "economy": 4500, "business": 9000 },
            "seatsAvailable": { "economy": 150, "business": 12 },
            "recurringDays": [1, 3]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let created = body["data"]["recurringFlightsCount"].as_u64().unwrap();
    assert!(created > 0);
    assert_eq!(body["data"]["mainFlight"]["flightNumber"], "FL300");

    let (status, body) = send(&app, Method::GET, "/api/schedules?limit=5&origin=DEL", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 5);
    // FL100 + FL300 + its recurrences
    let total = created + 2;
    assert_eq!(body["totalPages"], (total + 4) / 5);
    assert_eq!(body["pagination"]["next"]["page"], 2);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/schedules?page=18446744073709551615&limit=2",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert!(body["pagination"]["next"].is_null());

    let (_, body) = send(&app, Method::GET, "/api/flights?status=scheduled", None, None).await;
    assert_eq!(body["count"], total);
    assert_eq!(body["data"][0]["flightNumber"], "FL100");

    // Same base number again collides on every generated flight.
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/schedules",
        Some(&admin),
        Some(json!({
            "routeId": route_id,
            "flightNumber": "FL300",
            "aircraft": "A321",
            "departureTime": "2030-03-04T06:00:00Z",
            "arrivalTime": "2030-03-04T08:10:00Z",
            "price": { "economy": 4500, "business": 9000 },
            "seatsAvailable": { "economy": 150, "business": 12 },
            "recurringDays": [1, 3]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_oversized_fares_are_rejected() {
    let app = test_app();
    let (admin, route_id, flight_id) = seed_network(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/flights",
        Some(&admin),
        Some(json!({
            "flightNumber": "FL900",
            "route": route_id,
            "aircraft": "A320",
            "departureTime": "2030-02-01T09:00:00Z",
            "arrivalTime": "2030-02-01T11:10:00Z",
            "price": { "economy": 2_000_000_000u64, "business": 12000 },
            "seatsAvailable": { "economy": 10, "business": 2 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (user, _) = register(&app, "Asha", "asha@example.com").await;
    let mut request = booking_body(&flight_id);
    request["quotedFare"] = json!({ "totalPrice": 2_000_000_000u64 });
    let (status, body) = send(&app, Method::POST, "/api/bookings", Some(&user), Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (_, body) = send(&app, Method::GET, &format!("/api/flights/{}", flight_id), None, None).await;
    assert_eq!(body["data"]["seatsAvailable"]["economy"], 10);
}
