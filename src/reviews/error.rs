use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

/// Error types for review operations
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Product not found: {0}")]
    ProductNotFound(i32),

    /// No delivered order of this user contains the product
    #[error("Product {0} can only be reviewed after a delivered purchase")]
    NotEligible(i32),

    #[error("You have already reviewed product {0}")]
    Duplicate(i32),
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::DatabaseError(e) => ApiError::DatabaseError(e),
            ReviewError::ProductNotFound(id) => ApiError::not_found("Product", id),
            ReviewError::NotEligible(_) => ApiError::Forbidden(err.to_string()),
            ReviewError::Duplicate(_) => ApiError::Conflict {
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
