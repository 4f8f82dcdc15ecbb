//! System handlers

use crate::server::handler::ApiError;

/// Health check handler
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Any route that is not registered
pub async fn fallback_handler() -> ApiError {
    ApiError::not_found("Route not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health_handler().await, "OK");
    }

    #[tokio::test]
    async fn test_fallback() {
        let response = fallback_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"status": 404, "detail": "Route not found"})
        );
    }
}
