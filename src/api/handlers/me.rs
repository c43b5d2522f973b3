use crate::api::{handlers, ApiState};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

// axum handler for the per-request authentication check
pub async fn me(state: Extension<Arc<ApiState>>, headers: HeaderMap) -> Response {
    match handlers::current_identity(&state, &headers) {
        Some(identity) => Json(identity).into_response(),
        None => (StatusCode::UNAUTHORIZED, "unauthorized").into_response(),
    }
}
