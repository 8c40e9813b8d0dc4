// HTTP handlers for cart endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::cart::{AddToCartRequest, CartError, CartLineResponse, CartResponse};
use crate::error::ApiError;
use crate::AppState;

/// Handler for POST /api/cart
/// Adds a line to the caller's cart or replaces its quantity
#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Cart line stored", body = CartLineResponse),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Unknown product or variation")
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn add_to_cart_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartLineResponse>), ApiError> {
    request.validate()?;

    let item = state
        .cart_service
        .upsert(
            user.user_id,
            request.product_id,
            request.variation_id,
            request.quantity,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Handler for GET /api/cart
#[utoipa::path(
    get,
    path = "/api/cart",
    responses((status = 200, description = "Caller's cart", body = CartResponse)),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn get_cart_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CartResponse>, CartError> {
    let items = state.cart_service.list(user.user_id).await?;
    Ok(Json(CartResponse::from_items(items)))
}

/// Handler for DELETE /api/cart/{item_id}
#[utoipa::path(
    delete,
    path = "/api/cart/{item_id}",
    params(("item_id" = i32, Path, description = "Cart line ID")),
    responses(
        (status = 204, description = "Line removed"),
        (status = 404, description = "No such line in the caller's cart")
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn remove_cart_item_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<i32>,
) -> Result<StatusCode, CartError> {
    state.cart_service.remove(user.user_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
