use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
///
/// The pipeline variants (`ModelUnavailable` through `InvalidModelChoice`) are
/// consumed by the component that raised them; only the plumbing variants ever
/// reach the HTTP layer.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Malformed model response: {0}")]
    ModelMalformedResponse(String),

    #[error("Catalog returned no candidates")]
    CatalogEmpty,

    #[error("Image fetch failed: {0}")]
    ImageFetchFailure(String),

    #[error("Image decode failed: {0}")]
    ImageDecodeFailure(String),

    #[error("Invalid model choice: {0}")]
    InvalidModelChoice(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Database(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::HttpClient(_)
            | AppError::ModelUnavailable(_)
            | AppError::ModelMalformedResponse(_)
            | AppError::ImageFetchFailure(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::ImageDecodeFailure(_) | AppError::InvalidModelChoice(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::CatalogEmpty => (StatusCode::NOT_FOUND, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
