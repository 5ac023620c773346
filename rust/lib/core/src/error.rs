use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Stable, machine-readable error codes.
///
/// Clients match on `code` from `{"code": "NOT_FOUND", "message": "..."}`,
/// never on the message, which may be reworded.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Error returned by every HTTP handler.
///
/// Renders as `{"code": "NOT_FOUND", "message": "Flock not found"}` with the
/// status from [`ServiceError::status_code`].
#[derive(Error, Debug)]
pub enum ServiceError {
    /// 404. Also used for resources owned by someone else.
    #[error("{0}")]
    NotFound(String),

    /// 409.
    #[error("{0}")]
    Conflict(String),

    /// 400.
    #[error("{0}")]
    Validation(String),

    /// 401: missing, expired or tampered token.
    #[error("{0}")]
    Unauthorized(String),

    /// 403: plan limits, inactive accounts, disabled features.
    #[error("{0}")]
    PermissionDenied(String),

    /// 502: the payment provider refused or was unreachable.
    #[error("{0}")]
    Upstream(String),

    /// 500.
    #[error("{0}")]
    Storage(String),

    /// 500.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use error_code::*;
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND),
            Self::Conflict(_) => (StatusCode::CONFLICT, ALREADY_EXISTS),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, VALIDATION_FAILED),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, UNAUTHENTICATED),
            Self::PermissionDenied(_) => (StatusCode::FORBIDDEN, PERMISSION_DENIED),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, UPSTREAM_ERROR),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, STORAGE_ERROR),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL),
        }
    }

    pub fn error_code(&self) -> &'static str {
        self.parts().1
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let body = serde_json::json!({
            "code": code,
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code() {
        let cases = [
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT, "ALREADY_EXISTS"),
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            (ServiceError::PermissionDenied("x".into()), StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            (ServiceError::Upstream("x".into()), StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            (ServiceError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            (ServiceError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status, "{err:?}");
            assert_eq!(err.error_code(), code, "{err:?}");
        }
    }

    #[tokio::test]
    async fn test_json_body() {
        let resp = ServiceError::NotFound("Flock not found".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"code": "NOT_FOUND", "message": "Flock not found"})
        );
    }

    #[test]
    fn test_display_is_message_only() {
        assert_eq!(ServiceError::Upstream("M-Pesa API Error: timeout".into()).to_string(),
            "M-Pesa API Error: timeout");
    }
}
