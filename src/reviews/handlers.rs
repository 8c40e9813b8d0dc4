// HTTP handlers for review endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::reviews::{CreateReviewRequest, ProductReviewsResponse, ReviewError, ReviewResponse};
use crate::AppState;

/// Handler for POST /api/reviews
/// Reviews a product the caller has received
#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Invalid rating or product already reviewed"),
        (status = 403, description = "No delivered order contains the product"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
pub async fn create_review_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    // Validate request
    request.validate()?;

    let review = state
        .review_service
        .create_review(user.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(review.into())))
}

/// Handler for GET /api/products/{product_id}/reviews
#[utoipa::path(
    get,
    path = "/api/products/{product_id}/reviews",
    params(("product_id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Reviews with average rating", body = ProductReviewsResponse),
        (status = 404, description = "Product not found")
    ),
    tag = "reviews"
)]
pub async fn get_product_reviews_handler(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<Json<ProductReviewsResponse>, ReviewError> {
    let reviews = state.review_service.get_product_reviews(product_id).await?;
    Ok(Json(reviews))
}
