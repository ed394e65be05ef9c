use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::error::SongDbError;

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub reason: &'static str,
    pub description: String,
}

/// An HTTP error carrying a status and a user-facing description.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    description: String,
}

impl ApiError {
    pub fn bad_request(description: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            description: description.into(),
        }
    }

    pub fn not_found(description: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            description: description.into(),
        }
    }

    pub fn internal(description: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            description: description.into(),
        }
    }

    pub fn unavailable(description: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            description: description.into(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            StatusCode::BAD_REQUEST => "Bad request",
            StatusCode::UNAUTHORIZED => "Unauthorized",
            StatusCode::NOT_FOUND => "Not found",
            StatusCode::SERVICE_UNAVAILABLE => "Service unavailable",
            _ => "Internal server error",
        }
    }
}

impl From<SongDbError> for ApiError {
    fn from(e: SongDbError) -> Self {
        match e {
            SongDbError::Validation(message) => ApiError::bad_request(message),
            SongDbError::NotFound(message) => ApiError::not_found(message),
            other => {
                error!("Request failed: {}", other);
                ApiError::internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: self.status.as_u16(),
            reason: self.reason(),
            description: self.description,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (SongDbError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (SongDbError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (
                SongDbError::Storage(anyhow::anyhow!("locked")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), status);
        }
    }

    #[test]
    fn reason_phrases() {
        assert_eq!(ApiError::bad_request("x").reason(), "Bad request");
        assert_eq!(ApiError::not_found("x").reason(), "Not found");
        assert_eq!(ApiError::internal("x").reason(), "Internal server error");
    }
}
