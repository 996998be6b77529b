//! Auth gate consumed by the upgrade endpoint.
//!
//! The hub does not own authentication policy: credentials are
//! established elsewhere (login flow, token issuance) and the gate only
//! checks that a connection request carries an already-established
//! identity. Rejection happens before the WebSocket upgrade, so a
//! refused caller never touches any room state.

use axum::http::{HeaderMap, header::COOKIE};
use thiserror::Error;

/// Identity confirmed by the auth gate for one connection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

/// Errors returned by the auth gate. All of them map to an
/// unauthorized response at the HTTP layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no credentials presented")]
    MissingCredentials,
    #[error("credentials carry an empty identity")]
    EmptyIdentity,
}

/// Validates a caller's identity before a connection pump is built.
pub trait AuthGate: Send + Sync {
    /// Confirm the identity behind a connection request, or reject it.
    fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError>;
}

/// Auth gate backed by an identity cookie set during login.
///
/// The cookie value is the user id; issuing and verifying the login
/// token that produced it is the login flow's job, not the hub's.
pub struct CookieAuthGate {
    cookie_name: String,
}

impl CookieAuthGate {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }
}

impl AuthGate for CookieAuthGate {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let user_id = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookies| cookie_value(cookies, &self.cookie_name))
            .ok_or(AuthError::MissingCredentials)?;

        if user_id.is_empty() {
            return Err(AuthError::EmptyIdentity);
        }

        Ok(Identity { user_id })
    }
}

/// Extract one cookie's value from a `Cookie` header line.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_authenticate_with_auth_cookie() {
        // given:
        let gate = CookieAuthGate::new("auth");
        let headers = headers_with_cookie("auth=alice");

        // when:
        let result = gate.authenticate(&headers);

        // then:
        assert_eq!(
            result,
            Ok(Identity {
                user_id: "alice".to_string()
            })
        );
    }

    #[test]
    fn test_authenticate_picks_cookie_out_of_many() {
        // given:
        let gate = CookieAuthGate::new("auth");
        let headers = headers_with_cookie("theme=dark; auth=bob; lang=en");

        // when:
        let result = gate.authenticate(&headers);

        // then:
        assert_eq!(result.unwrap().user_id, "bob");
    }

    #[test]
    fn test_authenticate_without_cookie_header_is_rejected() {
        // given:
        let gate = CookieAuthGate::new("auth");
        let headers = HeaderMap::new();

        // when:
        let result = gate.authenticate(&headers);

        // then:
        assert_eq!(result, Err(AuthError::MissingCredentials));
    }

    #[test]
    fn test_authenticate_with_other_cookies_only_is_rejected() {
        // given:
        let gate = CookieAuthGate::new("auth");
        let headers = headers_with_cookie("theme=dark; lang=en");

        // when:
        let result = gate.authenticate(&headers);

        // then:
        assert_eq!(result, Err(AuthError::MissingCredentials));
    }

    #[test]
    fn test_authenticate_with_empty_identity_is_rejected() {
        // given:
        let gate = CookieAuthGate::new("auth");
        let headers = headers_with_cookie("auth=");

        // when:
        let result = gate.authenticate(&headers);

        // then:
        assert_eq!(result, Err(AuthError::EmptyIdentity));
    }
}
