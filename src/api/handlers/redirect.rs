use crate::api::{handlers, ApiState};
use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

// axum handler for the OAuth redirect back from the identity provider
//
// Two-phase one-time-token handling: check the state value first, run the
// external code exchange, and only consume the sequence number once the
// exchange produced a verified identity. A transient exchange failure leaves
// the token unconsumed so the user can retry the same login flow.
pub async fn redirect(
    state: Extension<Arc<ApiState>>,
    Query(query): Query<RedirectQuery>,
) -> Response {
    if let Some(provider_error) = query.error {
        if provider_error == "access_denied" {
            return Redirect::temporary("/login").into_response();
        }
        error!(
            "provider returned error {}: {}",
            provider_error,
            query.error_description.unwrap_or_default()
        );
        return (StatusCode::UNAUTHORIZED, "auth failed").into_response();
    }

    let (Some(code), Some(one_time)) = (query.code, query.state) else {
        return (StatusCode::UNAUTHORIZED, "auth failed").into_response();
    };

    // Validate without consuming
    let sequence = match state.onetime.check(&one_time) {
        Ok(sequence) => sequence,
        Err(error) => {
            error!("one-time token rejected: {}", error);
            return (StatusCode::UNAUTHORIZED, "auth failed").into_response();
        }
    };

    let identity = match state.provider.exchange(&code).await {
        Ok(identity) => identity,
        Err(error) => {
            error!("code exchange failed: {}", error);
            return (StatusCode::UNAUTHORIZED, "auth failed").into_response();
        }
    };

    // Finalize: retire the one-time token now that the login succeeded
    if let Err(error) = state.onetime.consume(sequence) {
        error!("one-time token consume rejected: {}", error);
        return (StatusCode::UNAUTHORIZED, "auth failed").into_response();
    }

    info!("login completed for user {}", identity.id);

    let credential = state.sessions.issue(&identity);
    let mut response = Redirect::temporary("/").into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        handlers::session_set_cookie(&credential, state.cookie_secure),
    );
    response
}
