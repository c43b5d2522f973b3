use crate::api::{handlers, ApiState};
use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::sync::Arc;

// axum handler for the service status page
pub async fn root(state: Extension<Arc<ApiState>>, headers: HeaderMap) -> impl IntoResponse {
    let identity = handlers::current_identity(&state, &headers);

    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "authenticated": identity.is_some(),
        "identity": identity,
    }))
}
