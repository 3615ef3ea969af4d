use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use storefront_catalog::CatalogError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Catalog(CatalogError::Validation(_))
            | ApiError::Catalog(CatalogError::AlreadyUnavailable { .. })
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Catalog(CatalogError::Configuration(_))
            | ApiError::Catalog(CatalogError::Store(_))
            | ApiError::Metrics(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Catalog(e) => e.code(),
            ApiError::BadRequest(_) => "ValidationError",
            ApiError::Metrics(_) | ApiError::Internal(_) => "InternalError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = Uuid::new_v4();

        let body = if status.is_server_error() {
            tracing::error!(%request_id, code = self.code(), "Request failed: {}", self);
            json!({
                "error": "Internal server error",
                "code": self.code(),
                "message": self.to_string(),
                "request_id": request_id,
            })
        } else {
            json!({
                "error": self.to_string(),
                "code": self.code(),
                "request_id": request_id,
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_catalog::ValidationError;

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::from(CatalogError::from(ValidationError::MissingId)), StatusCode::BAD_REQUEST),
            (
                ApiError::from(CatalogError::AlreadyUnavailable { id: 1, name: "Widget".into() }),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::from(CatalogError::NotFound(9)), StatusCode::NOT_FOUND),
            (
                ApiError::from(CatalogError::Configuration("missing host".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(CatalogError::Store(sqlx::Error::PoolTimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::BadRequest("expected value".into()), StatusCode::BAD_REQUEST),
        ];

        for (error, status) in cases {
            assert_eq!(error.status(), status, "{}", error);
        }
    }

    #[test]
    fn malformed_body_is_tagged_as_validation() {
        assert_eq!(ApiError::BadRequest("eof".into()).code(), "ValidationError");
    }
}
