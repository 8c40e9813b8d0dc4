use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::addresses::AddressBook;
use crate::cart::{CartError, CartRepository};
use crate::catalog::{price_line, CatalogRepository};
use crate::config::CheckoutSettings;
use crate::coupons::CouponEngine;
use crate::orders::{
    CheckoutLineRequest, CheckoutOutcome, CheckoutPlan, CheckoutRequest, CouponRedemption,
    Customer, NewOrderLine, Order, OrderError, OrderRepository, OrderResponse, OrderStatus,
    PriceCalculator, StatusMachine,
};
use crate::payments::{GatewayKind, PaymentInfo, PaymentRepository};
use crate::validation::MAX_LINE_QUANTITY;

const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;
const ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// Human-readable order number: `ORD-YYYYMMDD-XXXXXX`
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ORDER_NUMBER_ALPHABET[rng.gen_range(0..ORDER_NUMBER_ALPHABET.len())] as char)
        .collect();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

/// Service for order business logic
///
/// The acting customer is always passed in; nothing here reads request state.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogRepository>,
    carts: Arc<dyn CartRepository>,
    addresses: Arc<dyn AddressBook>,
    payments: Arc<dyn PaymentRepository>,
    coupons: CouponEngine,
    settings: CheckoutSettings,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogRepository>,
        carts: Arc<dyn CartRepository>,
        addresses: Arc<dyn AddressBook>,
        payments: Arc<dyn PaymentRepository>,
        coupons: CouponEngine,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            orders,
            catalog,
            carts,
            addresses,
            payments,
            coupons,
            settings,
        }
    }

    /// Turn a cart (or an explicit line list) into a persisted order
    ///
    /// # Steps
    /// 1. Replay the original order when the idempotency key was seen before
    /// 2. Price every line from the current catalog state
    /// 3. Resolve the shipping address snapshot
    /// 4. Check the correlated payment record belongs to the caller and gateway
    /// 5. Re-validate the user's active coupon and compute the discount
    /// 6. Add shipping and check the payment covers the total
    /// 7. Persist everything in one transaction, which also reads the payment
    ///    status under a row lock
    ///
    /// Lookup and validation failures surface before anything is written.
    pub async fn checkout(
        &self,
        customer: Customer,
        idempotency_key: Option<String>,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, OrderError> {
        // Keys are scoped per user; a guest has nothing to scope them to
        let idempotency_key = match customer {
            Customer::User(_) => normalize_idempotency_key(idempotency_key)?,
            Customer::Guest => None,
        };

        if let (Customer::User(user_id), Some(key)) = (customer, idempotency_key.as_deref()) {
            if let Some(order) = self.orders.find_by_idempotency_key(user_id, key).await? {
                tracing::info!(
                    "Replaying order {} for idempotency key {}",
                    order.order_number,
                    key
                );
                let items = self.orders.find_items(order.id).await?;
                return Ok(CheckoutOutcome {
                    order: OrderResponse::new(order, items),
                    replayed: true,
                });
            }
        }

        let (requested_lines, from_cart) = self.requested_lines(customer, &request).await?;

        // Price each line
        let mut lines = Vec::with_capacity(requested_lines.len());
        for requested in &requested_lines {
            if !(1..=MAX_LINE_QUANTITY).contains(&requested.quantity) {
                return Err(OrderError::InvalidQuantity(requested.quantity));
            }

            let priced =
                price_line(self.catalog.as_ref(), requested.product_id, requested.variation_id)
                    .await?;
            let variation_snapshot = priced.variation_snapshot();

            lines.push(NewOrderLine {
                product_id: requested.product_id,
                product_variation_id: requested.variation_id,
                product_name: priced.product.name,
                variation_snapshot,
                unit_price: priced.unit_price,
                quantity: requested.quantity,
                total_price: PriceCalculator::calculate_subtotal(
                    requested.quantity,
                    priced.unit_price,
                ),
            });
        }

        let (shipping_address, contact_number) = self.shipping_snapshot(customer, &request).await?;

        let payment = match request.transaction_id.as_deref() {
            Some(transaction_id) => {
                self.correlated_payment(customer, transaction_id, request.payment_method)
                    .await?
            }
            None => None,
        };

        let line_totals: Vec<Decimal> = lines.iter().map(|line| line.total_price).collect();
        let subtotal = PriceCalculator::calculate_total(&line_totals);

        // Coupon
        let (coupon, discount) = match customer {
            Customer::User(user_id) => match self.coupons.resolve_active(user_id).await? {
                Some(active) => {
                    let descriptor = self.coupons.revalidate(&active).await?;
                    let discount = CouponEngine::discount_for(&descriptor, subtotal);
                    (
                        Some(CouponRedemption {
                            applied_id: active.applied.id,
                            coupon_id: active.coupon.id,
                        }),
                        discount,
                    )
                }
                None => (None, Decimal::ZERO),
            },
            Customer::Guest => (None, Decimal::ZERO),
        };

        let shipping_cost = request
            .shipping_cost
            .unwrap_or(self.settings.default_shipping_cost);
        let totals = PriceCalculator::totals(&line_totals, discount, shipping_cost);

        if let Some(payment) = &payment {
            if payment.amount < totals.total_price {
                return Err(OrderError::ValidationError(format!(
                    "Payment {} of {} does not cover the order total {}",
                    payment.transaction_id, payment.amount, totals.total_price
                )));
            }
        }

        // payment_status is derived inside the transaction from the locked payment row
        let mut plan = CheckoutPlan {
            order_number: generate_order_number(Utc::now()),
            customer,
            totals,
            currency: self.settings.currency.clone(),
            exchange_rate: self.settings.exchange_rate,
            payment_method: request.payment_method,
            payment_id: payment.map(|p| p.id),
            coupon,
            shipping_address,
            contact_number,
            notes: request.notes.clone(),
            idempotency_key,
            clear_cart: customer.user_id().is_some(),
            lines,
        };

        let mut attempt = 1;
        let persisted = loop {
            match self.orders.persist_checkout(plan.clone()).await {
                Err(OrderError::OrderNumberTaken(taken)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    tracing::warn!("Order number {} collided; generating another", taken);
                    plan.order_number = generate_order_number(Utc::now());
                    attempt += 1;
                }
                result => break result?,
            }
        };

        if !persisted.replayed {
            tracing::info!(
                "Order {} placed by {:?}: {} line(s) from {}, total {} {} ({})",
                persisted.order.order_number,
                customer,
                persisted.items.len(),
                if from_cart { "cart" } else { "request" },
                persisted.order.total_price,
                persisted.order.currency,
                persisted.order.payment_status
            );
        }

        Ok(CheckoutOutcome {
            order: OrderResponse::new(persisted.order, persisted.items),
            replayed: persisted.replayed,
        })
    }

    /// Get all orders for a user, newest first
    pub async fn get_user_orders(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderResponse>, OrderError> {
        let orders = self.orders.find_by_user(user_id, status).await?;

        let mut order_responses = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.orders.find_items(order.id).await?;
            order_responses.push(OrderResponse::new(order, items));
        }

        Ok(order_responses)
    }

    /// Get a specific order; other users' orders are forbidden
    pub async fn get_order(&self, order_id: Uuid, user_id: i32) -> Result<OrderResponse, OrderError> {
        let order = self.owned_order(order_id, user_id).await?;
        let items = self.orders.find_items(order.id).await?;
        Ok(OrderResponse::new(order, items))
    }

    /// Cancel one of the user's own orders
    ///
    /// Payment status is left alone; a late callback still updates it but
    /// never reopens the order.
    pub async fn cancel(&self, order_id: Uuid, user_id: i32) -> Result<OrderResponse, OrderError> {
        let order = self.owned_order(order_id, user_id).await?;
        let target = StatusMachine::cancel(order.status)?;

        let updated = match self.orders.update_status(order_id, order.status, target).await? {
            Some(updated) => updated,
            None => {
                // Lost a race; report against the status that won
                let current = self.find_order(order_id).await?;
                StatusMachine::cancel(current.status)?;
                return Err(OrderError::InvalidTransition {
                    from: current.status,
                    to: target,
                });
            }
        };

        tracing::info!("Order {} cancelled by user {}", updated.order_number, user_id);
        let items = self.orders.find_items(order_id).await?;
        Ok(OrderResponse::new(updated, items))
    }

    /// Admin fulfillment progression; forward only
    pub async fn advance(
        &self,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<OrderResponse, OrderError> {
        let order = self.find_order(order_id).await?;
        StatusMachine::transition(order.status, target)?;

        let updated = if order.status == target {
            order
        } else {
            match self.orders.update_status(order_id, order.status, target).await? {
                Some(updated) => updated,
                None => {
                    let current = self.find_order(order_id).await?;
                    return Err(OrderError::InvalidTransition {
                        from: current.status,
                        to: target,
                    });
                }
            }
        };

        tracing::info!("Order {} is now {}", updated.order_number, updated.status);
        let items = self.orders.find_items(order_id).await?;
        Ok(OrderResponse::new(updated, items))
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    async fn owned_order(&self, order_id: Uuid, user_id: i32) -> Result<Order, OrderError> {
        let order = self.find_order(order_id).await?;

        // Verify the order belongs to the requesting user
        if order.user_id != Some(user_id) {
            return Err(OrderError::Forbidden(
                "You do not have permission to access this order".to_string(),
            ));
        }

        Ok(order)
    }

    /// The payment record named by the checkout, if it exists
    ///
    /// It must belong to the caller and match the claimed payment method.
    /// An unknown transaction id leaves the order unpaid.
    async fn correlated_payment(
        &self,
        customer: Customer,
        transaction_id: &str,
        payment_method: GatewayKind,
    ) -> Result<Option<PaymentInfo>, OrderError> {
        let Some(payment) = self.payments.find_by_transaction_id(transaction_id).await? else {
            tracing::debug!(
                "Checkout references unknown transaction {}; order stays unpaid",
                transaction_id
            );
            return Ok(None);
        };

        if payment.user_id.is_some() && payment.user_id != customer.user_id() {
            return Err(OrderError::Forbidden(
                "Payment belongs to another user".to_string(),
            ));
        }

        if payment.gateway != payment_method {
            return Err(OrderError::ValidationError(format!(
                "Payment {} was made via {}, not {}",
                transaction_id, payment.gateway, payment_method
            )));
        }

        Ok(Some(payment))
    }

    /// Explicit lines win; otherwise a signed-in user's cart is used
    async fn requested_lines(
        &self,
        customer: Customer,
        request: &CheckoutRequest,
    ) -> Result<(Vec<CheckoutLineRequest>, bool), OrderError> {
        if !request.items.is_empty() {
            return Ok((request.items.clone(), false));
        }

        let Customer::User(user_id) = customer else {
            return Err(OrderError::ValidationError(
                "Guest checkout requires at least one item".to_string(),
            ));
        };

        let cart = self.carts.list(user_id).await.map_err(|e| match e {
            CartError::DatabaseError(db) => OrderError::DatabaseError(db),
            other => OrderError::ValidationError(other.to_string()),
        })?;
        if cart.is_empty() {
            return Err(OrderError::ValidationError("Cart is empty".to_string()));
        }

        let lines = cart
            .into_iter()
            .map(|item| CheckoutLineRequest {
                product_id: item.product_id,
                variation_id: item.product_variation_id,
                quantity: item.quantity,
            })
            .collect();
        Ok((lines, true))
    }

    /// Address and contact copied onto the order
    ///
    /// A saved address supplies both; explicit request fields override it.
    async fn shipping_snapshot(
        &self,
        customer: Customer,
        request: &CheckoutRequest,
    ) -> Result<(String, String), OrderError> {
        let saved = match request.address_id {
            Some(address_id) => {
                let Customer::User(user_id) = customer else {
                    return Err(OrderError::ValidationError(
                        "Saved addresses require sign-in".to_string(),
                    ));
                };
                let address = self
                    .addresses
                    .find_for_user(user_id, address_id)
                    .await?
                    .ok_or(OrderError::AddressNotFound(address_id))?;
                Some(address)
            }
            None => None,
        };

        let shipping_address = request
            .shipping_address
            .clone()
            .or_else(|| saved.as_ref().map(|a| a.address_line.clone()))
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| OrderError::ValidationError("Shipping address is required".to_string()))?;
        let contact_number = request
            .contact_number
            .clone()
            .or_else(|| saved.as_ref().map(|a| a.contact_number.clone()))
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| OrderError::ValidationError("Contact number is required".to_string()))?;

        Ok((shipping_address, contact_number))
    }
}

fn normalize_idempotency_key(key: Option<String>) -> Result<Option<String>, OrderError> {
    let Some(key) = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(OrderError::ValidationError(format!(
            "Idempotency-Key must be at most {} characters",
            MAX_IDEMPOTENCY_KEY_LEN
        )));
    }
    Ok(Some(key))
}
