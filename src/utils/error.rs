use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::engine::EngineError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Engine(engine) => match engine {
                EngineError::InsufficientInventory { .. } => StatusCode::CONFLICT,
                EngineError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
                EngineError::InvalidBundleComposition(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::FeeConfigMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
                EngineError::RefundBlocked(_) => StatusCode::CONFLICT,
                EngineError::StaleOrder(_) => StatusCode::GONE,
                EngineError::InvalidState(_) => StatusCode::CONFLICT,
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            },
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Engine(engine) => match engine {
                EngineError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
                EngineError::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
                EngineError::InvalidBundleComposition(_) => "INVALID_BUNDLE_COMPOSITION",
                EngineError::FeeConfigMissing(_) => "FEE_CONFIG_MISSING",
                EngineError::RefundBlocked(_) => "REFUND_BLOCKED",
                EngineError::StaleOrder(_) => "STALE_ORDER",
                EngineError::InvalidState(_) => "INVALID_STATE",
                EngineError::NotFound(_) => "NOT_FOUND",
                EngineError::Validation(_) => "VALIDATION_ERROR",
            },
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::Engine(engine) => {
                error!(error = ?engine, code = self.code(), "Engine error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Engine errors carry caller-actionable messages; only the internal
        // variant is masked.
        let public_message = match &self {
            AppError::ValidationError(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Engine(engine) => engine.to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        };

        error_response(code, public_message, None, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn engine_errors_map_to_stable_codes() {
        let id = Uuid::new_v4();
        let cases: Vec<(AppError, &str, StatusCode)> = vec![
            (
                EngineError::InsufficientInventory {
                    id,
                    requested: 2,
                    available: 1,
                }
                .into(),
                "INSUFFICIENT_INVENTORY",
                StatusCode::CONFLICT,
            ),
            (
                EngineError::InsufficientCredits {
                    needed: 5,
                    remaining: 0,
                }
                .into(),
                "INSUFFICIENT_CREDITS",
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                EngineError::FeeConfigMissing(id).into(),
                "FEE_CONFIG_MISSING",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                EngineError::StaleOrder(id).into(),
                "STALE_ORDER",
                StatusCode::GONE,
            ),
            (
                EngineError::RefundBlocked("scanned".into()).into(),
                "REFUND_BLOCKED",
                StatusCode::CONFLICT,
            ),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status_code(), status);
        }
    }
}
