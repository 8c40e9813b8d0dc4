use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

/// Error types for coupon operations
#[derive(Debug, thiserror::Error)]
pub enum CouponError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Coupon not found: {0}")]
    NotFound(String),

    #[error("Coupon {code} is not valid: {reason}")]
    Invalid { code: String, reason: String },

    #[error("Coupon {0} has already been used")]
    AlreadyUsed(String),

    #[error("Coupon {0} is already applied")]
    AlreadyApplied(String),

    /// The reservation was consumed or released after checkout read it
    #[error("Coupon reservation {0} is no longer available")]
    ReservationConsumed(i32),

    #[error("No active coupon")]
    NoActiveCoupon,
}

impl From<CouponError> for ApiError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::DatabaseError(e) => ApiError::DatabaseError(e),
            CouponError::NotFound(code) => ApiError::not_found("Coupon", code),
            CouponError::Invalid { .. } => ApiError::BadRequest(err.to_string()),
            CouponError::NoActiveCoupon => ApiError::not_found("Applied coupon", "active"),
            CouponError::AlreadyUsed(_)
            | CouponError::AlreadyApplied(_)
            | CouponError::ReservationConsumed(_) => ApiError::Conflict {
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for CouponError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
