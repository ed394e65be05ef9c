//! HTTP basic authentication guarding the song and admin routes.

use super::config::BasicCredentials;
use super::errors::ErrorBody;
use super::metrics::record_auth_failure;
use super::state::ServerState;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

const BASIC_PREFIX: &str = "Basic ";
const CHALLENGE: &str = "Basic realm=\"Login Required\"";

/// Extracts `(username, password)` from a `Authorization: Basic ...` header.
fn parse_basic_authorization(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix(BASIC_PREFIX)?.trim();
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn is_authorized(headers: &HeaderMap, expected: &BasicCredentials) -> bool {
    match parse_basic_authorization(headers) {
        Some((username, password)) => {
            username == expected.username && password == expected.password
        }
        None => false,
    }
}

fn unauthorized() -> Response {
    let body = ErrorBody {
        status: StatusCode::UNAUTHORIZED.as_u16(),
        reason: "Unauthorized",
        description: "Could not verify your access level for that URL. \
                      You have to login with proper credentials"
            .to_string(),
    };
    let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
    response
}

pub async fn require_basic_auth(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config.credentials.as_ref() else {
        return next.run(request).await;
    };
    if !is_authorized(request.headers(), expected) {
        debug!("Rejecting unauthenticated request to {}", request.uri());
        record_auth_failure();
        return unauthorized();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn credentials() -> BasicCredentials {
        BasicCredentials {
            username: "admin".to_string(),
            password: "s3cret:pw".to_string(),
        }
    }

    #[test]
    fn accepts_matching_credentials() {
        let encoded = STANDARD.encode("admin:s3cret:pw");
        let headers = headers_with(&format!("Basic {}", encoded));
        assert_eq!(
            parse_basic_authorization(&headers),
            Some(("admin".to_string(), "s3cret:pw".to_string()))
        );
        assert!(is_authorized(&headers, &credentials()));
    }

    #[test]
    fn rejects_wrong_or_malformed_credentials() {
        let wrong = headers_with(&format!("Basic {}", STANDARD.encode("admin:nope")));
        assert!(!is_authorized(&wrong, &credentials()));

        let bearer = headers_with("Bearer abc");
        assert!(!is_authorized(&bearer, &credentials()));

        let garbage = headers_with("Basic !!!");
        assert!(!is_authorized(&garbage, &credentials()));

        assert!(!is_authorized(&HeaderMap::new(), &credentials()));
    }

    #[test]
    fn challenge_header_is_set() {
        let response = unauthorized();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            CHALLENGE
        );
    }
}
