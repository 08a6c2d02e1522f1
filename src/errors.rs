use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepoError;
use crate::resumes::ResumeError;

pub const FILE_TOO_LARGE_MESSAGE: &str = "File size too large. Maximum size is 5MB";
pub const ONLY_PDF_MESSAGE: &str = "Only PDF files are allowed";

/// Application-level error type.
/// Implements `IntoResponse` so handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("origin not allowed")]
    CorsRejected,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("unsupported media type")]
    UnsupportedMediaType,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::PayloadTooLarge
            | AppError::UnsupportedMediaType => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::CorsRejected => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::CorsRejected => "CORS policy: Origin not allowed".into(),
            AppError::PayloadTooLarge => FILE_TOO_LARGE_MESSAGE.into(),
            AppError::UnsupportedMediaType => ONLY_PDF_MESSAGE.into(),
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "Internal server error".into()
            }
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                "Internal server error".into()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "message": self.client_message(),
        }));
        (status, body).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Duplicate(what) => AppError::Conflict(format!("{what} already exists")),
            RepoError::Database(e) => AppError::Database(e),
            RepoError::InvalidRow(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<ResumeError> for AppError {
    fn from(e: ResumeError) -> Self {
        match e {
            ResumeError::UnsupportedType(_) => AppError::UnsupportedMediaType,
            ResumeError::TooLarge(_) => AppError::PayloadTooLarge,
            ResumeError::Backend(e) => AppError::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn taxonomy_maps_to_status_codes() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::CorsRejected.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::PayloadTooLarge.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::UnsupportedMediaType.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_errors_hide_their_detail() {
        let resp = AppError::Internal(anyhow::anyhow!("secret connection string leaked"))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Internal server error");
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let json = body_json(AppError::NotFound("Candidate not found".into()).into_response()).await;
        assert_eq!(json["message"], "Candidate not found");
        let json = body_json(AppError::PayloadTooLarge.into_response()).await;
        assert_eq!(json["message"], FILE_TOO_LARGE_MESSAGE);
    }

    #[test]
    fn duplicate_rows_become_conflicts() {
        let err: AppError = RepoError::Duplicate("candidate").into();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
