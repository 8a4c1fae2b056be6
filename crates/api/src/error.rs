//! API error types with HTTP response mapping.

use application::{ApplicationError, ValidationError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::SaleError;
use sale_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Error raised by the sale service.
    Application(ApplicationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, Vec::new()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Vec::new()),
            ApiError::Application(err) => application_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }
        metrics::counter!("api_errors_total", "status" => status.as_u16().to_string())
            .increment(1);

        let body = if details.is_empty() {
            serde_json::json!({ "error": message })
        } else {
            serde_json::json!({ "error": message, "details": details })
        };
        (status, axum::Json(body)).into_response()
    }
}

fn application_error_to_response(err: ApplicationError) -> (StatusCode, String, Vec<ValidationError>) {
    let message = err.to_string();
    match err {
        ApplicationError::Validation(details) => (StatusCode::BAD_REQUEST, message, details),
        ApplicationError::NotFound { .. } => (StatusCode::NOT_FOUND, message, Vec::new()),
        ApplicationError::Conflict(_) => (StatusCode::CONFLICT, message, Vec::new()),
        ApplicationError::Sale(sale_err) => (sale_error_status(&sale_err), message, Vec::new()),
        ApplicationError::Store(store_err) => (store_error_status(&store_err), message, Vec::new()),
    }
}

fn sale_error_status(err: &SaleError) -> StatusCode {
    match err {
        SaleError::BusinessRuleViolation { .. } | SaleError::MissingItem => StatusCode::BAD_REQUEST,
        SaleError::SaleFrozen { .. } | SaleError::ItemCancelled { .. } => StatusCode::CONFLICT,
    }
}

fn store_error_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::DuplicateSaleNumber(_) => StatusCode::CONFLICT,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::CorruptRecord(_) | StoreError::Database(_) | StoreError::Migration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        ApiError::Application(err)
    }
}
