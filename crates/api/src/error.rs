//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed path or query parameter.
    BadRequest(String),
    /// Domain outcome, mapped by kind.
    Domain(DomainError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => domain_status(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Domain(err) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %err, "internal server error");
                "Internal server error".to_string()
            }
            ApiError::Domain(err) => err.to_string(),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Unauthenticated
        | DomainError::InvalidCredentials
        | DomainError::InvalidOrExpiredLink => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden { .. } => StatusCode::FORBIDDEN,
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::InvalidTransition { .. }
        | DomainError::Conflict { .. }
        | DomainError::AlreadyExists { .. } => StatusCode::CONFLICT,
        DomainError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Store(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, OrderStatus};

    #[test]
    fn domain_errors_map_to_status_codes() {
        let cases = [
            (DomainError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (DomainError::InvalidOrExpiredLink, StatusCode::UNAUTHORIZED),
            (
                DomainError::Forbidden { action: "approve" },
                StatusCode::FORBIDDEN,
            ),
            (
                DomainError::InvalidTransition {
                    action: "cancel",
                    current: OrderStatus::Dispatched,
                },
                StatusCode::CONFLICT,
            ),
            (
                DomainError::Conflict {
                    order_id: OrderId::new(),
                    expected: OrderStatus::Approved,
                    actual: OrderStatus::Cancelled,
                },
                StatusCode::CONFLICT,
            ),
            (
                DomainError::InvalidInput("bad".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                DomainError::Timeout {
                    operation: "orders.get",
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DomainError::Store(store::StoreError::Corrupt("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                DomainError::Internal("task panicked".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() {
        let response = ApiError::from(DomainError::Store(store::StoreError::Corrupt(
            "secret detail".to_string(),
        )))
        .into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
