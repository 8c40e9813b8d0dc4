use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::payments::{GatewayKind, PaymentInfoStatus};
use crate::validation::{validate_contact_number, validate_non_negative_amount};

/// Fulfillment status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state of an order; moved only by payment records, never by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    /// Convert payment status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Order payment status implied by a payment record; None while pending
    pub fn from_payment(status: PaymentInfoStatus) -> Option<Self> {
        match status {
            PaymentInfoStatus::Pending => None,
            PaymentInfoStatus::Complete => Some(PaymentStatus::Paid),
            PaymentInfoStatus::Failed => Some(PaymentStatus::Failed),
            PaymentInfoStatus::Cancelled => Some(PaymentStatus::Cancelled),
        }
    }

    /// Payment status of a new order backed by a payment in `status`
    ///
    /// Only a complete payment pays for an order; anything else leaves it
    /// unpaid.
    pub fn at_checkout(status: PaymentInfoStatus) -> Self {
        match status {
            PaymentInfoStatus::Complete => PaymentStatus::Paid,
            _ => PaymentStatus::Unpaid,
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing an order in the database
///
/// Prices and the address are snapshots taken at checkout; only `status`,
/// `payment_status` and `updated_at` change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<i32>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: GatewayKind,
    pub payment_id: Option<Uuid>,
    pub coupon_id: Option<i32>,
    pub shipping_address: String,
    pub contact_number: String,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Domain model representing an item within an order
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: Uuid,
    pub product_id: i32,
    pub product_variation_id: Option<i32>,
    pub product_name: String,
    pub variation_snapshot: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
}

/// Request DTO for one checkout line
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckoutLineRequest {
    pub product_id: i32,
    pub variation_id: Option<i32>,
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    pub quantity: i32,
}

/// Request DTO for POST /api/checkout
///
/// With no `items`, a signed-in user's cart is checked out. `address_id`
/// picks a saved address whose text is copied onto the order.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    #[validate]
    pub items: Vec<CheckoutLineRequest>,
    #[validate(length(min = 1, max = 1000, message = "Shipping address must be 1-1000 characters"))]
    pub shipping_address: Option<String>,
    #[validate(custom = "validate_contact_number")]
    pub contact_number: Option<String>,
    pub payment_method: GatewayKind,
    pub address_id: Option<i32>,
    /// Correlation id of a payment started via /api/payment/init
    pub transaction_id: Option<String>,
    #[validate(custom = "validate_non_negative_amount")]
    pub shipping_cost: Option<Decimal>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

/// Request DTO for PATCH /api/orders/{id}/status
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Response DTO for order with items
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<i32>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: GatewayKind,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub shipping_address: String,
    pub contact_number: String,
    pub notes: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            status: order.status,
            payment_status: order.payment_status,
            payment_method: order.payment_method,
            subtotal: order.subtotal,
            discount: order.discount,
            shipping_cost: order.shipping_cost,
            total_price: order.total_price,
            currency: order.currency,
            exchange_rate: order.exchange_rate,
            shipping_address: order.shipping_address,
            contact_number: order.contact_number,
            notes: order.notes,
            items: items.into_iter().map(Into::into).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Response DTO for order item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i32,
    pub product_id: i32,
    pub variation_id: Option<i32>,
    pub product_name: String,
    pub variation: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            variation_id: item.product_variation_id,
            product_name: item.product_name,
            variation: item.variation_snapshot,
            unit_price: item.unit_price,
            quantity: item.quantity,
            total_price: item.total_price,
        }
    }
}

/// Who is checking out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Customer {
    Guest,
    User(i32),
}

impl Customer {
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Customer::Guest => None,
            Customer::User(id) => Some(*id),
        }
    }
}

/// Result of a checkout; `replayed` is true when an idempotency key matched
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: OrderResponse,
    pub replayed: bool,
}
