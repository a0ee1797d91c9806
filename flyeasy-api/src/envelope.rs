use axum::{http::StatusCode, Json};
use serde::Serialize;

/// `{"success": true, "count"?: n, "data": ...}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub kind: &'static str,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        count: None,
        data,
    })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok(data))
}

pub fn list<T: Serialize>(items: Vec<T>) -> Json<Envelope<Vec<T>>> {
    Json(Envelope {
        success: true,
        count: Some(items.len()),
        data: items,
    })
}

/// Body for deletes and logout.
pub fn empty() -> Json<Envelope<serde_json::Value>> {
    ok(serde_json::json!({}))
}
