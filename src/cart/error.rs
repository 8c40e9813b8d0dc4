use axum::response::{IntoResponse, Response};

use crate::catalog::LineLookupError;
use crate::error::ApiError;
use crate::validation::MAX_LINE_QUANTITY;

/// Error types for cart operations
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Product not found: {0}")]
    ProductNotFound(i32),

    #[error("Variation {variation_id} not found for product {product_id}")]
    VariationNotFound { product_id: i32, variation_id: i32 },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Cart item not found: {0}")]
    ItemNotFound(i32),
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::DatabaseError(e) => ApiError::DatabaseError(e),
            CartError::ProductNotFound(id) => ApiError::not_found("Product", id),
            CartError::VariationNotFound { variation_id, .. } => {
                ApiError::not_found("Product variation", variation_id)
            }
            CartError::InvalidQuantity(quantity) => ApiError::BadRequest(format!(
                "Quantity must be between 1 and {}, got {}",
                MAX_LINE_QUANTITY, quantity
            )),
            CartError::ItemNotFound(id) => ApiError::not_found("Cart item", id),
        }
    }
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

impl From<LineLookupError> for CartError {
    fn from(err: LineLookupError) -> Self {
        match err {
            LineLookupError::ProductNotFound(id) => CartError::ProductNotFound(id),
            LineLookupError::VariationNotFound {
                product_id,
                variation_id,
            } => CartError::VariationNotFound {
                product_id,
                variation_id,
            },
            LineLookupError::Database(e) => CartError::DatabaseError(e),
        }
    }
}
