use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("No feedback history for user {0}")]
    NoFeedbackHistory(String),

    #[error("Infeasible constraint: {0}")]
    InfeasibleConstraint(String),

    #[error("Feature space mismatch: expected schema {expected:#x}, found {found:#x}")]
    FeatureSpaceMismatch { expected: u64, found: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable name for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Cache(_) | AppError::DataUnavailable(_) => {
                "data_unavailable"
            }
            AppError::NoFeedbackHistory(_) => "no_feedback_history",
            AppError::InfeasibleConstraint(_) => "infeasible_constraint",
            AppError::FeatureSpaceMismatch { .. } => "feature_space_mismatch",
            AppError::Validation(_) => "validation",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match self {
            AppError::NoFeedbackHistory(_) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::InfeasibleConstraint(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Database(_) | AppError::Cache(_) | AppError::DataUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::FeatureSpaceMismatch { .. } => {
                tracing::error!(error = %self, "Feature space invariant violated");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
