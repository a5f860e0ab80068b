//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

/// Service-level failures surfaced at the HTTP boundary.
///
/// Malformed request attributes never reach here; the reconciler absorbs them.
#[derive(Debug)]
pub enum AppError {
    /// Anything raised while transforming, scoring or attributing a request.
    /// Carries the original error text unchanged.
    InferenceFailure(String),
}

impl AppError {
    pub fn message(&self) -> &str {
        match self {
            AppError::InferenceFailure(msg) => msg,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InferenceFailure(msg) => write!(f, "inference failure: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InferenceFailure(msg) => {
                tracing::error!("Inference failure: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.message(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        AppError::InferenceFailure(err.to_string())
    }
}

/// Errors raised by the preprocessor / model adapters, at load time or per call.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact: {0}")]
    Invalid(String),

    #[error("{0}")]
    Transform(String),

    #[error("{0}")]
    Scoring(String),
}
