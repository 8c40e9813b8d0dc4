// HTTP handlers for coupon endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::coupons::{ActiveCouponResponse, ApplyCouponRequest, CouponDiscount, CouponError};
use crate::error::ApiError;
use crate::AppState;

/// Handler for POST /api/coupon/apply
/// Reserves a coupon for the caller's next checkout
#[utoipa::path(
    post,
    path = "/api/coupon/apply",
    request_body = ApplyCouponRequest,
    responses(
        (status = 200, description = "Coupon reserved", body = CouponDiscount),
        (status = 400, description = "Invalid, expired, already used or already applied"),
        (status = 404, description = "Unknown coupon code")
    ),
    security(("bearer_auth" = [])),
    tag = "coupons"
)]
pub async fn apply_coupon_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ApplyCouponRequest>,
) -> Result<Json<CouponDiscount>, ApiError> {
    request.validate()?;

    let discount = state
        .coupon_engine
        .apply(&request.code, user.user_id)
        .await?;

    Ok(Json(discount))
}

/// Handler for GET /api/coupon/active
/// Returns the caller's reservation, or null when there is none
#[utoipa::path(
    get,
    path = "/api/coupon/active",
    responses((status = 200, description = "Active reservation or null", body = Option<ActiveCouponResponse>)),
    security(("bearer_auth" = [])),
    tag = "coupons"
)]
pub async fn get_active_coupon_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Option<ActiveCouponResponse>>, CouponError> {
    let active = state.coupon_engine.resolve_active(user.user_id).await?;

    let response = active.and_then(|active| {
        active.coupon.discount().map(|discount| ActiveCouponResponse {
            code: active.coupon.code,
            discount,
            expires_at: active.applied.expires_at,
        })
    });

    Ok(Json(response))
}

/// Handler for DELETE /api/coupon/active
#[utoipa::path(
    delete,
    path = "/api/coupon/active",
    responses(
        (status = 204, description = "Reservation released"),
        (status = 404, description = "No active reservation")
    ),
    security(("bearer_auth" = [])),
    tag = "coupons"
)]
pub async fn release_coupon_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, CouponError> {
    state.coupon_engine.release(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
