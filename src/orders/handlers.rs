// HTTP handlers for checkout and order endpoints

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, AuthenticatedUser, MaybeUser};
use crate::error::ApiError;
use crate::orders::{
    CheckoutRequest, Customer, OrderError, OrderResponse, OrderStatus, UpdateStatusRequest,
};
use crate::AppState;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Query parameters for order history
#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderHistoryQuery {
    /// Optional status filter
    pub status: Option<OrderStatus>,
}

/// Handler for POST /api/checkout
/// Places an order from the caller's cart or from explicit lines
///
/// Guests may check out with explicit lines. A repeated `Idempotency-Key`
/// from the same user returns the original order with 200.
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    params(("Idempotency-Key" = Option<String>, Header, description = "Client key making retries safe")),
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 200, description = "Order previously placed with this key", body = OrderResponse),
        (status = 400, description = "Validation error, coupon conflict or aborted transaction"),
        (status = 404, description = "Unknown product, variation or address")
    ),
    tag = "orders"
)]
pub async fn checkout_handler(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    // Validate request
    request.validate()?;

    let customer = match user {
        Some(user) => Customer::User(user.user_id),
        None => Customer::Guest,
    };
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| ApiError::BadRequest("Idempotency-Key must be ASCII".to_string()))
        })
        .transpose()?;

    let outcome = state
        .order_service
        .checkout(customer, idempotency_key, request)
        .await?;

    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome.order)))
}

/// Handler for GET /api/orders
/// Retrieves order history for the authenticated user
#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderHistoryQuery),
    responses((status = 200, description = "Caller's orders, newest first", body = [OrderResponse])),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_history_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<OrderHistoryQuery>,
) -> Result<Json<Vec<OrderResponse>>, OrderError> {
    let orders = state
        .order_service
        .get_user_orders(user.user_id, query.status)
        .await?;

    Ok(Json(orders))
}

/// Handler for GET /api/orders/{order_id}
/// Retrieves a specific order by ID
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items", body = OrderResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_by_id_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    // Authorization check is done in service layer
    let order = state
        .order_service
        .get_order(order_id, user.user_id)
        .await?;

    Ok(Json(order))
}

/// Handler for POST /api/orders/{order_id}/cancel
/// Cancels one of the caller's orders
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/cancel",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 400, description = "Already cancelled or delivered"),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn cancel_order_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state.order_service.cancel(order_id, user.user_id).await?;
    Ok(Json(order))
}

/// Handler for PATCH /api/orders/{order_id}/status
/// Advances the fulfillment status of an order (admin only)
#[utoipa::path(
    patch,
    path = "/api/orders/{order_id}/status",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Invalid transition"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_order_status_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    tracing::debug!(
        "Admin {} moving order {} to {}",
        admin.user_id,
        order_id,
        request.status
    );

    let order = state
        .order_service
        .advance(order_id, request.status)
        .await?;

    Ok(Json(order))
}
