use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::payment::PaymentError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Authentication required".to_string())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden("You do not have permission to perform this action".to_string())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found", what))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::not_found(what),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        AppError::PaymentGateway(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Collect messages from field, struct and list errors, depth first.
fn collect_validation_messages(errors: &validator::ValidationErrors, out: &mut Vec<String>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_messages(nested, out),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect_validation_messages(nested, out);
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_validation_messages(&errors, &mut messages);
        messages.sort();
        messages.dedup();
        if messages.is_empty() {
            messages.push("Invalid request".to_string());
        }
        AppError::Validation(messages.join("; "))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let log_message = self.to_string();

        let client_message = match &self {
            AppError::Config(_) if is_production() => "Configuration error".to_string(),
            AppError::Database(_) | AppError::Internal(_) if is_production() => {
                "Internal server error".to_string()
            }
            AppError::PaymentGateway(_) if is_production() => {
                "Payment service temporarily unavailable".to_string()
            }
            _ => log_message.clone(),
        };

        // Always log the detailed error server-side
        if status.is_server_error() {
            tracing::error!(status = %status.as_u16(), message = %log_message, "API error");
        } else {
            tracing::warn!(status = %status.as_u16(), message = %log_message, "API error");
        }

        let body = ErrorResponse {
            success: false,
            message: client_message,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
