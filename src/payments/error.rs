use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::payments::{GatewayKind, PaymentInfoStatus};

/// Error types for payment operations
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Payment not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payment gateway '{0}' is not configured")]
    UnsupportedGateway(GatewayKind),

    #[error("Callback is missing tran_id")]
    MissingTransactionId,

    #[error("Invalid payment amount: {0}")]
    InvalidAmount(String),

    #[error("Payments via '{0}' are confirmed by an admin, not by gateway callbacks")]
    CallbackNotAccepted(GatewayKind),

    #[error("Payments via '{0}' are settled by the gateway, not by an admin")]
    ManualSettlementNotAllowed(GatewayKind),

    /// The provider did not vouch for a success callback; the payment stays pending
    #[error("Payment {0} could not be verified with the gateway")]
    Unverified(String),

    #[error("A payment can only be settled as complete, failed or cancelled, not {0}")]
    InvalidSettlement(PaymentInfoStatus),

    #[error("Payment {transaction_id} is already {status}")]
    AlreadySettled {
        transaction_id: String,
        status: PaymentInfoStatus,
    },

    /// Transport failure or unparseable gateway response; the attempt stays pending
    #[error("Payment gateway '{gateway}' unavailable: {reason}")]
    GatewayUnavailable {
        gateway: GatewayKind,
        transaction_id: Option<String>,
        reason: String,
    },
}

impl PaymentError {
    pub(crate) fn unavailable(gateway: GatewayKind, reason: impl ToString) -> Self {
        PaymentError::GatewayUnavailable {
            gateway,
            transaction_id: None,
            reason: reason.to_string(),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::DatabaseError(e) => ApiError::DatabaseError(e),
            PaymentError::NotFound(id) => ApiError::not_found("Payment", id),
            PaymentError::Forbidden(msg) => ApiError::Forbidden(msg),
            PaymentError::AlreadySettled { .. } => ApiError::Conflict {
                message: err.to_string(),
            },
            PaymentError::UnsupportedGateway(_)
            | PaymentError::InvalidAmount(_)
            | PaymentError::MissingTransactionId
            | PaymentError::CallbackNotAccepted(_)
            | PaymentError::ManualSettlementNotAllowed(_)
            | PaymentError::Unverified(_)
            | PaymentError::InvalidSettlement(_) => ApiError::BadRequest(err.to_string()),
            PaymentError::GatewayUnavailable {
                gateway,
                transaction_id,
                reason,
            } => ApiError::GatewayUnavailable {
                gateway: gateway.to_string(),
                transaction_id,
                reason,
            },
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
