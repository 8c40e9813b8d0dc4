use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cart::clear_cart;
use crate::coupons::{consume_reservation, CouponError};
use crate::db::is_unique_violation;
use crate::orders::price_calculator::OrderTotals;
use crate::orders::{Customer, Order, OrderError, OrderItem, OrderStatus, PaymentStatus};
use crate::payments::{GatewayKind, PaymentInfoStatus};

const ORDER_COLUMNS: &str = "id, order_number, user_id, subtotal, discount, shipping_cost, total_price, \
     currency, exchange_rate, status, payment_status, payment_method, payment_id, coupon_id, \
     shipping_address, contact_number, notes, idempotency_key, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, product_variation_id, product_name, \
     variation_snapshot, unit_price, quantity, total_price";

/// One priced line, ready to be written as an order item
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: i32,
    pub product_variation_id: Option<i32>,
    pub product_name: String,
    pub variation_snapshot: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
}

/// Reservation to consume together with the order
#[derive(Debug, Clone, Copy)]
pub struct CouponRedemption {
    pub applied_id: i32,
    pub coupon_id: i32,
}

/// Everything checkout decided before opening the transaction
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub order_number: String,
    pub customer: Customer,
    pub totals: OrderTotals,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub payment_method: GatewayKind,
    pub payment_id: Option<Uuid>,
    pub coupon: Option<CouponRedemption>,
    pub shipping_address: String,
    pub contact_number: String,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
    /// Delete the customer's cart lines on commit
    pub clear_cart: bool,
    pub lines: Vec<NewOrderLine>,
}

/// Result of `persist_checkout`
///
/// `replayed` is set when a concurrent request with the same idempotency key
/// committed first and its order was returned instead.
#[derive(Debug, Clone)]
pub struct PersistedCheckout {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub replayed: bool,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Write the order, its items, the coupon usage and the cart clear atomically
    async fn persist_checkout(&self, plan: CheckoutPlan) -> Result<PersistedCheckout, OrderError>;

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError>;

    async fn find_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError>;

    /// Orders of a user, newest first
    async fn find_by_user(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError>;

    async fn find_by_idempotency_key(
        &self,
        user_id: i32,
        key: &str,
    ) -> Result<Option<Order>, OrderError>;

    /// Move an order from `from` to `to`
    ///
    /// Returns None when the order is no longer in `from` (a concurrent
    /// update won).
    async fn update_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, OrderError>;
}

/// Repository for order operations
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn persist_checkout(&self, plan: CheckoutPlan) -> Result<PersistedCheckout, OrderError> {
        let mut tx = self.pool.begin().await?;
        let user_id = plan.customer.user_id();

        // Locking the payment row orders this read against a concurrent settle
        let payment_status = match plan.payment_id {
            Some(payment_id) => sqlx::query_scalar::<_, PaymentInfoStatus>(
                "SELECT status FROM payment_infos WHERE id = $1 FOR UPDATE",
            )
            .bind(payment_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(PaymentStatus::at_checkout)
            .unwrap_or_default(),
            None => PaymentStatus::Unpaid,
        };

        // Insert order
        let inserted = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (
                order_number, user_id, subtotal, discount, shipping_cost, total_price,
                currency, exchange_rate, status, payment_status, payment_method, payment_id,
                coupon_id, shipping_address, contact_number, notes, idempotency_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(&plan.order_number)
        .bind(user_id)
        .bind(plan.totals.subtotal)
        .bind(plan.totals.discount)
        .bind(plan.totals.shipping_cost)
        .bind(plan.totals.total_price)
        .bind(&plan.currency)
        .bind(plan.exchange_rate)
        .bind(OrderStatus::Pending)
        .bind(payment_status)
        .bind(plan.payment_method)
        .bind(plan.payment_id)
        .bind(plan.coupon.map(|c| c.coupon_id))
        .bind(&plan.shipping_address)
        .bind(&plan.contact_number)
        .bind(&plan.notes)
        .bind(&plan.idempotency_key)
        .fetch_one(&mut *tx)
        .await;

        let order = match inserted {
            Ok(order) => order,
            Err(e) if is_unique_violation(&e, "uq_orders_idempotency_key") => {
                tx.rollback().await?;
                return self.replay(user_id, plan.idempotency_key.as_deref()).await;
            }
            Err(e) if is_unique_violation(&e, "uq_orders_payment_id") => {
                return Err(OrderError::PaymentAlreadyUsed(
                    plan.payment_id.map(|id| id.to_string()).unwrap_or_default(),
                ));
            }
            Err(e) if is_unique_violation(&e, "orders_order_number_key") => {
                return Err(OrderError::OrderNumberTaken(plan.order_number));
            }
            Err(e) => return Err(e.into()),
        };

        // Insert order items
        let mut items = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            let item = sqlx::query_as::<_, OrderItem>(&format!(
                r#"
                INSERT INTO order_items (
                    order_id, product_id, product_variation_id, product_name,
                    variation_snapshot, unit_price, quantity, total_price
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {}
                "#,
                ITEM_COLUMNS
            ))
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.product_variation_id)
            .bind(&line.product_name)
            .bind(&line.variation_snapshot)
            .bind(line.unit_price)
            .bind(line.quantity)
            .bind(line.total_price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        if let (Some(redemption), Some(user_id)) = (plan.coupon, user_id) {
            // Dropping tx without commit rolls the order back
            consume_reservation(&mut *tx, redemption.applied_id, user_id, order.id, Utc::now())
                .await
                .map_err(|e| match e {
                    CouponError::DatabaseError(db) => OrderError::DatabaseError(db),
                    other => OrderError::TransactionAborted(other.to_string()),
                })?;
        }

        if let (true, Some(user_id)) = (plan.clear_cart, user_id) {
            let cleared = clear_cart(&mut *tx, user_id).await?;
            tracing::debug!("Cleared {} cart line(s) for user {}", cleared, user_id);
        }

        tx.commit().await?;

        Ok(PersistedCheckout {
            order,
            items,
            replayed: false,
        })
    }

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn find_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn find_by_user(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        let orders = match status {
            Some(status_filter) => {
                sqlx::query_as::<_, Order>(&format!(
                    r#"
                    SELECT {} FROM orders
                    WHERE user_id = $1 AND status = $2
                    ORDER BY created_at DESC
                    "#,
                    ORDER_COLUMNS
                ))
                .bind(user_id)
                .bind(status_filter)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Order>(&format!(
                    r#"
                    SELECT {} FROM orders
                    WHERE user_id = $1
                    ORDER BY created_at DESC
                    "#,
                    ORDER_COLUMNS
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(orders)
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: i32,
        key: &str,
    ) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 AND idempotency_key = $2",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn update_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }
}

impl PgOrderRepository {
    /// Load the order a concurrent request with the same key already committed
    async fn replay(
        &self,
        user_id: Option<i32>,
        key: Option<&str>,
    ) -> Result<PersistedCheckout, OrderError> {
        let (Some(user_id), Some(key)) = (user_id, key) else {
            return Err(OrderError::ValidationError(
                "Idempotency key conflict without a key".to_string(),
            ));
        };

        let order = self
            .find_by_idempotency_key(user_id, key)
            .await?
            .ok_or_else(|| OrderError::NotFound(key.to_string()))?;
        let items = self.find_items(order.id).await?;

        tracing::info!(
            "Checkout with idempotency key {} raced; returning order {}",
            key,
            order.order_number
        );
        Ok(PersistedCheckout {
            order,
            items,
            replayed: true,
        })
    }
}
