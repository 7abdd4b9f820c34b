use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::progress::{InvariantViolation, ProgressError};
use super::store::RepositoryError;

/// Failure surfaced by every placement operation.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    /// User-correctable input problem.
    #[error("{0}")]
    Validation(String),
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    /// Illegal lifecycle transition or an operation that would break a progression invariant.
    #[error("{0}")]
    StateConflict(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PlacementError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::StateConflict(message.into())
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::StateConflict(_) => "state_conflict",
            Self::Repository(_) => "repository",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::StateConflict(_) | Self::Repository(RepositoryError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProgressError> for PlacementError {
    fn from(value: ProgressError) -> Self {
        Self::StateConflict(value.to_string())
    }
}

impl From<InvariantViolation> for PlacementError {
    fn from(value: InvariantViolation) -> Self {
        Self::StateConflict(format!("progression invariant violated: {value}"))
    }
}

impl IntoResponse for PlacementError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}
