use crate::api::handlers;
use axum::{
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
};

// axum handler for logout
//
// The server keeps no session state; logout is client-side cookie deletion.
pub async fn logout() -> Response {
    let mut response = Redirect::temporary("/login").into_response();
    response
        .headers_mut()
        .insert(SET_COOKIE, handlers::session_clear_cookie());
    response
}
