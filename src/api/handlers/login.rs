use crate::api::{handlers, ApiState};
use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Redirect},
};
use std::sync::Arc;
use tracing::debug;

// axum handler for the login entry point
//
// Already-authenticated callers bounce home. Everyone else gets a one-time
// token embedded as the OAuth `state` value in the authorization URL.
pub async fn login(state: Extension<Arc<ApiState>>, headers: HeaderMap) -> impl IntoResponse {
    if handlers::current_identity(&state, &headers).is_some() {
        return Redirect::temporary("/");
    }

    let one_time = state.onetime.issue();
    let url = state.provider.authorize_url(&one_time);

    debug!("redirecting login to identity provider");

    Redirect::temporary(&url)
}
