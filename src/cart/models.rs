use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// A cart line as stored; `price` is the unit price at the last upsert
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub product_variation_id: Option<i32>,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written by an upsert, keyed by (user, product, variation)
#[derive(Debug, Clone)]
pub struct CartLineUpsert {
    pub user_id: i32,
    pub product_id: i32,
    pub product_variation_id: Option<i32>,
    pub quantity: i32,
    pub price: Decimal,
}

/// Request DTO for POST /api/cart
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: i32,
    pub variation_id: Option<i32>,
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    pub quantity: i32,
}

/// Response DTO for a cart line
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLineResponse {
    pub id: i32,
    pub product_id: i32,
    pub variation_id: Option<i32>,
    pub quantity: i32,
    /// Display hint only; checkout re-resolves the price
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<CartItem> for CartLineResponse {
    fn from(item: CartItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            variation_id: item.product_variation_id,
            quantity: item.quantity,
            unit_price: item.price,
            line_total: item.price * Decimal::from(item.quantity),
        }
    }
}

/// Response DTO for GET /api/cart
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    pub subtotal: Decimal,
}

impl CartResponse {
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let items: Vec<CartLineResponse> = items.into_iter().map(Into::into).collect();
        let subtotal = items.iter().map(|line| line.line_total).sum();
        Self { items, subtotal }
    }
}
