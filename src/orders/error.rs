use axum::response::{IntoResponse, Response};

use crate::catalog::LineLookupError;
use crate::coupons::CouponError;
use crate::error::ApiError;
use crate::orders::OrderStatus;
use crate::payments::PaymentError;

/// Error types for order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(i32),

    #[error("Variation {variation_id} not found for product {product_id}")]
    VariationNotFound { product_id: i32, variation_id: i32 },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Saved address not found: {0}")]
    AddressNotFound(i32),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Order is already cancelled")]
    AlreadyCancelled,

    #[error("Order in status {0} cannot be cancelled")]
    NotCancellable(OrderStatus),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Payment is already attached to another order
    #[error("Payment {0} is already linked to an order")]
    PaymentAlreadyUsed(String),

    /// Coupon checks before the transaction opened
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// Generated order number collided with an existing one
    #[error("Order number {0} is already taken")]
    OrderNumberTaken(String),

    /// A domain rule failed inside the checkout transaction; it was rolled back
    #[error("Checkout aborted: {0}")]
    TransactionAborted(String),
}

impl From<LineLookupError> for OrderError {
    fn from(err: LineLookupError) -> Self {
        match err {
            LineLookupError::ProductNotFound(id) => OrderError::ProductNotFound(id),
            LineLookupError::VariationNotFound {
                product_id,
                variation_id,
            } => OrderError::VariationNotFound {
                product_id,
                variation_id,
            },
            LineLookupError::Database(e) => OrderError::DatabaseError(e),
        }
    }
}

impl From<PaymentError> for OrderError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::DatabaseError(e) => OrderError::DatabaseError(e),
            PaymentError::Forbidden(msg) => OrderError::Forbidden(msg),
            other => OrderError::ValidationError(other.to_string()),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::DatabaseError(e) => ApiError::DatabaseError(e),
            OrderError::NotFound(id) => ApiError::not_found("Order", id),
            OrderError::ProductNotFound(id) => ApiError::not_found("Product", id),
            OrderError::VariationNotFound { variation_id, .. } => {
                ApiError::not_found("Product variation", variation_id)
            }
            OrderError::AddressNotFound(id) => ApiError::not_found("Address", id),
            OrderError::Forbidden(msg) => ApiError::Forbidden(msg),
            OrderError::Coupon(e) => e.into(),
            OrderError::TransactionAborted(message) => ApiError::TransactionAborted { message },
            OrderError::OrderNumberTaken(_) => ApiError::InternalError(err.to_string()),
            OrderError::AlreadyCancelled | OrderError::PaymentAlreadyUsed(_) => {
                ApiError::Conflict {
                    message: err.to_string(),
                }
            }
            OrderError::InvalidQuantity(_)
            | OrderError::ValidationError(_)
            | OrderError::NotCancellable(_)
            | OrderError::InvalidTransition { .. } => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_unknown_product_is_not_found() {
        let response = OrderError::ProductNotFound(99).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_aborted_transaction_is_bad_request() {
        let response = OrderError::TransactionAborted("coupon consumed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_foreign_order_is_forbidden() {
        let response = OrderError::Forbidden("not yours".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_coupon_errors_keep_their_mapping() {
        let response =
            OrderError::Coupon(CouponError::AlreadyUsed("SAVE10".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
