//! Shared handler types
//!
//! Every error the API returns is a JSON body of the form
//! `{"status": <code>, "detail": "<message>"}` with the matching HTTP status.

use crate::lens::geoip::LookupError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body of an error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub detail: String,
}

/// Error type for API handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    /// Create a new error
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    /// Create a not found error
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    /// Create an internal error
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status.as_u16(),
            detail: self.detail.clone(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.detail)
    }
}

impl std::error::Error for ApiError {}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        if let LookupError::Dataset(e) = &err {
            tracing::error!("dataset query failed: {}", e);
        }
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.detail())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup_error() {
        let err = ApiError::from(LookupError::InvalidAddress("x".to_string()));
        assert_eq!(err, ApiError::bad_request("Invalid IP address"));

        let err = ApiError::from(LookupError::NotFound);
        assert_eq!(err, ApiError::not_found("IP not found in ranges"));

        let err = ApiError::from(LookupError::Dataset(anyhow::anyhow!("locked")));
        assert_eq!(err, ApiError::internal("Database query failed"));
    }

    #[test]
    fn test_body_and_display() {
        let err = ApiError::bad_request("Missing ip parameter");
        assert_eq!(
            serde_json::to_value(err.body()).unwrap(),
            serde_json::json!({"status": 400, "detail": "Missing ip parameter"})
        );
        assert_eq!(err.to_string(), "400: Missing ip parameter");
    }
}
