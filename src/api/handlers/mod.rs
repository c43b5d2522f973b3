pub mod health;
pub use self::health::health;

pub mod root;
pub use self::root::root;

pub mod login;
pub use self::login::login;

pub mod redirect;
pub use self::redirect::redirect;

pub mod logout;
pub use self::logout::logout;

pub mod me;
pub use self::me::me;

// common functions for the handlers
use crate::api::ApiState;
use crate::provider::Identity;
use axum::http::{header, HeaderMap, HeaderValue};
use tracing::debug;

/// Cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "token";

/// Extract the raw session credential from the request cookies.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
}

/// Verify the caller's session cookie, if any.
pub fn current_identity(state: &ApiState, headers: &HeaderMap) -> Option<Identity> {
    let credential = session_cookie(headers)?;
    match state.sessions.verify(credential) {
        Ok(identity) => Some(identity),
        Err(error) => {
            debug!("session credential rejected: {}", error);
            None
        }
    }
}

/// `Set-Cookie` value carrying a freshly minted session credential.
pub fn session_set_cookie(credential: &str, secure: bool) -> HeaderValue {
    let cookie = if secure {
        format!("{SESSION_COOKIE}={credential}; Path=/; HttpOnly; SameSite=Lax; Secure")
    } else {
        format!("{SESSION_COOKIE}={credential}; Path=/; HttpOnly; SameSite=Lax")
    };
    // Credentials are base64url and the attributes are fixed ASCII
    cookie
        .parse()
        .unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` value deleting the session cookie.
pub fn session_clear_cookie() -> HeaderValue {
    HeaderValue::from_static("token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=abc.def.ghi; lang=en"),
        );
        assert_eq!(session_cookie(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_session_cookie_missing() {
        let headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_cookie(&headers), None);
    }

    #[test]
    fn test_session_cookie_ignores_prefixed_names() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("token2=nope; tokenish=also-no"),
        );
        assert_eq!(session_cookie(&headers), None);
    }

    #[test]
    fn test_set_cookie_attributes() {
        let value = session_set_cookie("abc", true);
        let value = value.to_str().expect("ascii");
        assert!(value.starts_with("token=abc"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Secure"));

        let value = session_set_cookie("abc", false);
        assert!(!value.to_str().expect("ascii").contains("Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let value = session_clear_cookie();
        assert!(value.to_str().expect("ascii").contains("Max-Age=0"));
    }
}
