// Error handling module for the storefront order service
// Provides the crate-wide error type and its HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

/// Main error type for the API
///
/// Every feature error (cart, coupons, payments, orders, reviews, auth)
/// converts into one of these variants, so all handlers render the same
/// structured body regardless of where the failure started.
#[derive(Debug)]
pub enum ApiError {
    /// Field-level validation errors from the validator crate
    /// Maps to HTTP 400 Bad Request
    ValidationError(validator::ValidationErrors),

    /// Malformed or missing input detected by service logic
    /// Maps to HTTP 400 Bad Request
    BadRequest(String),

    /// Unknown product, variation, coupon, order or payment
    /// Maps to HTTP 404 Not Found
    NotFound { resource: String, id: String },

    /// Coupon already used/applied, duplicate review, reused payment
    /// Maps to HTTP 400 Bad Request with a CONFLICT code
    Conflict { message: String },

    /// Missing or invalid credentials
    /// Maps to HTTP 401 Unauthorized
    Unauthorized(String),

    /// Acting on another user's resource, or missing role
    /// Maps to HTTP 403 Forbidden
    Forbidden(String),

    /// Payment provider unreachable or answered with garbage
    /// Maps to HTTP 503 Service Unavailable
    GatewayUnavailable {
        gateway: String,
        transaction_id: Option<String>,
        reason: String,
    },

    /// A domain rule failed inside the checkout transaction; nothing was persisted
    /// Maps to HTTP 400 Bad Request
    TransactionAborted { message: String },

    /// Database operation errors
    /// Maps to HTTP 500; details are only logged
    DatabaseError(sqlx::Error),

    /// Internal server errors
    /// Maps to HTTP 500; details are only logged
    InternalError(String),
}

/// Consistent error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "NOT_FOUND")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (e.g., field-level validation errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logging levels follow severity:
    /// - error!: database and internal faults (500-level)
    /// - warn!: conflicts, auth failures and gateway outages
    /// - debug!: expected client errors (validation, not found)
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
                        .with_details(
                            serde_json::to_value(errors).unwrap_or(serde_json::json!({})),
                        ),
                )
            }
            ApiError::BadRequest(message) => {
                debug!("Bad request: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("VALIDATION_ERROR", message.clone()),
                )
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("NOT_FOUND", format!("{} with id {} not found", resource, id)),
                )
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("CONFLICT", message.clone()),
                )
            }
            ApiError::Unauthorized(message) => {
                warn!("Unauthorized access attempt: {}", message);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("UNAUTHORIZED", message.clone()),
                )
            }
            ApiError::Forbidden(message) => {
                warn!("Forbidden access attempt: {}", message);
                (
                    StatusCode::FORBIDDEN,
                    ErrorResponse::new("FORBIDDEN", message.clone()),
                )
            }
            ApiError::GatewayUnavailable {
                gateway,
                transaction_id,
                reason,
            } => {
                // Kept apart from internal faults: the gateway may still settle the payment.
                warn!(
                    gateway = %gateway,
                    transaction_id = ?transaction_id,
                    "Payment gateway unavailable: {}",
                    reason
                );
                let mut response = ErrorResponse::new(
                    "GATEWAY_UNAVAILABLE",
                    format!("Payment gateway '{}' is currently unavailable", gateway),
                );
                if let Some(tran_id) = transaction_id {
                    response = response.with_details(serde_json::json!({
                        "transaction_id": tran_id,
                        "payment_status": "pending",
                    }));
                }
                (StatusCode::SERVICE_UNAVAILABLE, response)
            }
            ApiError::TransactionAborted { message } => {
                warn!("Checkout transaction aborted: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("TRANSACTION_ABORTED", message.clone()),
                )
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("DATABASE_ERROR", "A database error occurred"),
                )
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred"),
                )
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::GatewayUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::TransactionAborted { .. } => StatusCode::BAD_REQUEST,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub(crate) fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

/// Convert sqlx errors to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::DatabaseError(error)
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}
