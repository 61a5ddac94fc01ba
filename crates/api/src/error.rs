use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::sources::SourceStoreError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The source list could not be loaded.
    #[error(transparent)]
    Sources(#[from] SourceStoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Sources(err) => {
                tracing::error!(error = %err, "Failed to load script sources");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SOURCES_UNAVAILABLE",
                    "Script sources could not be loaded".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
