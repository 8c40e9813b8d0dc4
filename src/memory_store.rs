// In-memory implementation of every repository trait, for tests.
// persist_checkout checks everything before it mutates, so a failed checkout
// leaves no trace, matching the rollback of the PostgreSQL transaction.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::addresses::{AddressBook, SavedAddress};
use crate::cart::{CartError, CartItem, CartLineUpsert, CartRepository};
use crate::catalog::{CatalogRepository, Product, ProductVariation};
use crate::coupons::{AppliedCoupon, Coupon, CouponEngine, CouponError, CouponRepository};
use crate::orders::{
    CheckoutPlan, Order, OrderError, OrderItem, OrderRepository, OrderStatus, PaymentStatus,
    PersistedCheckout,
};
use crate::payments::{
    GatewayKind, NewPayment, PaymentError, PaymentInfo, PaymentInfoStatus, PaymentRepository,
};
use crate::reviews::{Review, ReviewError, ReviewRepository};

#[derive(Default)]
struct State {
    next_id: i32,
    products: HashMap<i32, Product>,
    variations: HashMap<i32, ProductVariation>,
    addresses: Vec<SavedAddress>,
    cart: Vec<CartItem>,
    coupons: Vec<Coupon>,
    applied: Vec<AppliedCoupon>,
    /// (coupon_id, user_id)
    usages: Vec<(i32, i32)>,
    payments: Vec<PaymentInfo>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    reviews: Vec<Review>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn usage_count(&self, coupon_id: i32) -> i64 {
        self.usages.iter().filter(|(c, _)| *c == coupon_id).count() as i64
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Insert or replace a product
    pub fn add_product(&self, product: Product) {
        self.state().products.insert(product.id, product);
    }

    pub fn add_variation(&self, variation: ProductVariation) {
        self.state().variations.insert(variation.id, variation);
    }

    pub fn add_address(&self, address: SavedAddress) {
        self.state().addresses.push(address);
    }

    pub fn add_coupon(&self, coupon: Coupon) {
        self.state().coupons.push(coupon);
    }

    pub fn add_coupon_usage(&self, coupon_id: i32, user_id: i32) {
        self.state().usages.push((coupon_id, user_id));
    }

    pub fn add_cart_line(
        &self,
        user_id: i32,
        product_id: i32,
        product_variation_id: Option<i32>,
        quantity: i32,
        price: rust_decimal::Decimal,
    ) -> CartItem {
        let mut state = self.state();
        let now = Utc::now();
        let item = CartItem {
            id: state.next_id(),
            user_id,
            product_id,
            product_variation_id,
            quantity,
            price,
            created_at: now,
            updated_at: now,
        };
        state.cart.push(item.clone());
        item
    }

    pub fn add_payment(&self, payment: NewPayment, status: PaymentInfoStatus) -> PaymentInfo {
        let now = Utc::now();
        let info = PaymentInfo {
            id: Uuid::new_v4(),
            transaction_id: payment.transaction_id,
            user_id: payment.user_id,
            gateway: payment.gateway,
            amount: payment.amount,
            status,
            created_at: now,
            updated_at: now,
        };
        self.state().payments.push(info.clone());
        info
    }

    /// A past order of one unit of `product_id` in the given status
    pub fn add_purchase(&self, user_id: i32, product_id: i32, status: OrderStatus) -> Order {
        let mut state = self.state();
        let now = Utc::now();
        let price = state
            .products
            .get(&product_id)
            .map(|p| p.base_price)
            .unwrap_or_default();
        let order = Order {
            id: Uuid::new_v4(),
            order_number: format!("ORD-SEED-{}", state.orders.len() + 1),
            user_id: Some(user_id),
            subtotal: price,
            discount: rust_decimal::Decimal::ZERO,
            shipping_cost: rust_decimal::Decimal::ZERO,
            total_price: price,
            currency: "BDT".to_string(),
            exchange_rate: rust_decimal::Decimal::ONE,
            status,
            payment_status: PaymentStatus::Paid,
            payment_method: GatewayKind::CashOnDelivery,
            payment_id: None,
            coupon_id: None,
            shipping_address: "Seeded".to_string(),
            contact_number: "01711000000".to_string(),
            notes: None,
            idempotency_key: None,
            created_at: now,
            updated_at: now,
        };
        let item = OrderItem {
            id: state.next_id(),
            order_id: order.id,
            product_id,
            product_variation_id: None,
            product_name: format!("Product {}", product_id),
            variation_snapshot: None,
            unit_price: price,
            quantity: 1,
            total_price: price,
        };
        state.orders.push(order.clone());
        state.items.push(item);
        order
    }

    pub fn cart_of(&self, user_id: i32) -> Vec<CartItem> {
        self.state()
            .cart
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.state().orders.clone()
    }

    pub fn order_items(&self) -> Vec<OrderItem> {
        self.state().items.clone()
    }

    pub fn coupon_usages(&self) -> Vec<(i32, i32)> {
        self.state().usages.clone()
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn find_product(&self, id: i32) -> Result<Option<Product>, sqlx::Error> {
        Ok(self.state().products.get(&id).cloned())
    }

    async fn find_variation(&self, id: i32) -> Result<Option<ProductVariation>, sqlx::Error> {
        Ok(self.state().variations.get(&id).cloned())
    }
}

#[async_trait]
impl AddressBook for MemoryStore {
    async fn find_for_user(
        &self,
        user_id: i32,
        address_id: i32,
    ) -> Result<Option<SavedAddress>, sqlx::Error> {
        Ok(self
            .state()
            .addresses
            .iter()
            .find(|a| a.id == address_id && a.user_id == user_id)
            .cloned())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn upsert(&self, line: CartLineUpsert) -> Result<CartItem, CartError> {
        let mut state = self.state();
        let now = Utc::now();

        if let Some(existing) = state.cart.iter_mut().find(|item| {
            item.user_id == line.user_id
                && item.product_id == line.product_id
                && item.product_variation_id == line.product_variation_id
        }) {
            existing.quantity = line.quantity;
            existing.price = line.price;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let item = CartItem {
            id: state.next_id(),
            user_id: line.user_id,
            product_id: line.product_id,
            product_variation_id: line.product_variation_id,
            quantity: line.quantity,
            price: line.price,
            created_at: now,
            updated_at: now,
        };
        state.cart.push(item.clone());
        Ok(item)
    }

    async fn list(&self, user_id: i32) -> Result<Vec<CartItem>, CartError> {
        Ok(self.cart_of(user_id))
    }

    async fn remove(&self, user_id: i32, item_id: i32) -> Result<bool, CartError> {
        let mut state = self.state();
        let before = state.cart.len();
        state
            .cart
            .retain(|item| !(item.id == item_id && item.user_id == user_id));
        Ok(state.cart.len() != before)
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, CouponError> {
        Ok(self.state().coupons.iter().find(|c| c.code == code).cloned())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Coupon>, CouponError> {
        Ok(self.state().coupons.iter().find(|c| c.id == id).cloned())
    }

    async fn count_usages(&self, coupon_id: i32) -> Result<i64, CouponError> {
        Ok(self.state().usage_count(coupon_id))
    }

    async fn has_usage(&self, coupon_id: i32, user_id: i32) -> Result<bool, CouponError> {
        Ok(self.state().usages.contains(&(coupon_id, user_id)))
    }

    async fn find_unused_reservation(
        &self,
        coupon_id: i32,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<AppliedCoupon>, CouponError> {
        Ok(self
            .state()
            .applied
            .iter()
            .find(|a| {
                a.coupon_id == coupon_id && a.user_id == user_id && !a.is_used && a.expires_at > now
            })
            .cloned())
    }

    async fn reserve(
        &self,
        user_id: i32,
        coupon: &Coupon,
        expires_at: DateTime<Utc>,
    ) -> Result<AppliedCoupon, CouponError> {
        let mut state = self.state();
        state.applied.retain(|a| !(a.user_id == user_id && !a.is_used));

        let applied = AppliedCoupon {
            id: state.next_id(),
            user_id,
            coupon_id: coupon.id,
            is_used: false,
            expires_at,
            created_at: Utc::now(),
        };
        state.applied.push(applied.clone());
        Ok(applied)
    }

    async fn find_active(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<AppliedCoupon>, CouponError> {
        Ok(self
            .state()
            .applied
            .iter()
            .rev()
            .find(|a| a.user_id == user_id && !a.is_used && a.expires_at > now)
            .cloned())
    }

    async fn release(&self, user_id: i32) -> Result<Option<AppliedCoupon>, CouponError> {
        let mut state = self.state();
        let now = Utc::now();
        let position = state
            .applied
            .iter()
            .position(|a| a.user_id == user_id && !a.is_used && a.expires_at > now);
        Ok(position.map(|i| state.applied.remove(i)))
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn create(&self, payment: NewPayment) -> Result<PaymentInfo, PaymentError> {
        Ok(self.add_payment(payment, PaymentInfoStatus::Pending))
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentInfo>, PaymentError> {
        Ok(self
            .state()
            .payments
            .iter()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    async fn settle(
        &self,
        transaction_id: &str,
        status: PaymentInfoStatus,
    ) -> Result<Option<PaymentInfo>, PaymentError> {
        let mut state = self.state();
        let now = Utc::now();

        let Some(payment) = state.payments.iter_mut().find(|p| {
            p.transaction_id == transaction_id && p.status == PaymentInfoStatus::Pending
        }) else {
            return Ok(None);
        };
        payment.status = status;
        payment.updated_at = now;
        let settled = payment.clone();

        if let Some(payment_status) = PaymentStatus::from_payment(status) {
            for order in state.orders.iter_mut().filter(|o| {
                o.payment_id == Some(settled.id) && o.payment_status == PaymentStatus::Unpaid
            }) {
                order.payment_status = payment_status;
                order.updated_at = now;
            }
        }

        Ok(Some(settled))
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn persist_checkout(&self, plan: CheckoutPlan) -> Result<PersistedCheckout, OrderError> {
        let mut state = self.state();
        let now = Utc::now();
        let user_id = plan.customer.user_id();

        if let (Some(user_id), Some(key)) = (user_id, plan.idempotency_key.as_deref()) {
            if let Some(order) = state
                .orders
                .iter()
                .find(|o| o.user_id == Some(user_id) && o.idempotency_key.as_deref() == Some(key))
                .cloned()
            {
                let items = state
                    .items
                    .iter()
                    .filter(|i| i.order_id == order.id)
                    .cloned()
                    .collect();
                return Ok(PersistedCheckout {
                    order,
                    items,
                    replayed: true,
                });
            }
        }

        if state.orders.iter().any(|o| o.order_number == plan.order_number) {
            return Err(OrderError::OrderNumberTaken(plan.order_number));
        }

        let payment_status = match plan.payment_id {
            Some(payment_id) => {
                if state.orders.iter().any(|o| o.payment_id == Some(payment_id)) {
                    return Err(OrderError::PaymentAlreadyUsed(payment_id.to_string()));
                }
                state
                    .payments
                    .iter()
                    .find(|p| p.id == payment_id)
                    .map(|p| PaymentStatus::at_checkout(p.status))
                    .unwrap_or_default()
            }
            None => PaymentStatus::Unpaid,
        };

        // Coupon checks happen before any write
        let redemption = match (plan.coupon, user_id) {
            (Some(redemption), Some(user_id)) => {
                let abort = |e: CouponError| OrderError::TransactionAborted(e.to_string());

                let applied_index = state
                    .applied
                    .iter()
                    .position(|a| a.id == redemption.applied_id && a.user_id == user_id && !a.is_used)
                    .ok_or_else(|| abort(CouponError::ReservationConsumed(redemption.applied_id)))?;
                let coupon = state
                    .coupons
                    .iter()
                    .find(|c| c.id == redemption.coupon_id)
                    .cloned()
                    .ok_or_else(|| abort(CouponError::NotFound(redemption.coupon_id.to_string())))?;

                CouponEngine::validate(&coupon, state.usage_count(coupon.id), now).map_err(abort)?;
                if state.usages.contains(&(coupon.id, user_id)) {
                    return Err(abort(CouponError::AlreadyUsed(coupon.code)));
                }
                Some((applied_index, coupon.id, user_id))
            }
            _ => None,
        };

        let order = Order {
            id: Uuid::new_v4(),
            order_number: plan.order_number,
            user_id,
            subtotal: plan.totals.subtotal,
            discount: plan.totals.discount,
            shipping_cost: plan.totals.shipping_cost,
            total_price: plan.totals.total_price,
            currency: plan.currency,
            exchange_rate: plan.exchange_rate,
            status: OrderStatus::Pending,
            payment_status,
            payment_method: plan.payment_method,
            payment_id: plan.payment_id,
            coupon_id: plan.coupon.map(|c| c.coupon_id),
            shipping_address: plan.shipping_address,
            contact_number: plan.contact_number,
            notes: plan.notes,
            idempotency_key: plan.idempotency_key,
            created_at: now,
            updated_at: now,
        };

        let mut items = Vec::with_capacity(plan.lines.len());
        for line in plan.lines {
            items.push(OrderItem {
                id: state.next_id(),
                order_id: order.id,
                product_id: line.product_id,
                product_variation_id: line.product_variation_id,
                product_name: line.product_name,
                variation_snapshot: line.variation_snapshot,
                unit_price: line.unit_price,
                quantity: line.quantity,
                total_price: line.total_price,
            });
        }

        if let Some((applied_index, coupon_id, user_id)) = redemption {
            state.applied[applied_index].is_used = true;
            state.usages.push((coupon_id, user_id));
        }
        if let (true, Some(user_id)) = (plan.clear_cart, user_id) {
            state.cart.retain(|item| item.user_id != user_id);
        }

        state.orders.push(order.clone());
        state.items.extend(items.iter().cloned());

        Ok(PersistedCheckout {
            order,
            items,
            replayed: false,
        })
    }

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        Ok(self.state().orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn find_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        Ok(self
            .state()
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_by_user(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .state()
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == Some(user_id))
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect())
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: i32,
        key: &str,
    ) -> Result<Option<Order>, OrderError> {
        Ok(self
            .state()
            .orders
            .iter()
            .find(|o| o.user_id == Some(user_id) && o.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn update_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, OrderError> {
        let mut state = self.state();
        let Some(order) = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && o.status == from)
        else {
            return Ok(None);
        };
        order.status = to;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn has_delivered_purchase(
        &self,
        user_id: i32,
        product_id: i32,
    ) -> Result<bool, ReviewError> {
        let state = self.state();
        Ok(state
            .orders
            .iter()
            .filter(|o| o.user_id == Some(user_id) && o.status == OrderStatus::Delivered)
            .any(|o| {
                state
                    .items
                    .iter()
                    .any(|i| i.order_id == o.id && i.product_id == product_id)
            }))
    }

    async fn create(
        &self,
        user_id: i32,
        product_id: i32,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review, ReviewError> {
        let mut state = self.state();
        if state
            .reviews
            .iter()
            .any(|r| r.user_id == user_id && r.product_id == product_id)
        {
            return Err(ReviewError::Duplicate(product_id));
        }

        let review = Review {
            id: state.next_id(),
            user_id,
            product_id,
            rating,
            comment,
            created_at: Utc::now(),
        };
        state.reviews.push(review.clone());
        Ok(review)
    }

    async fn list_for_product(&self, product_id: i32) -> Result<Vec<Review>, ReviewError> {
        Ok(self
            .state()
            .reviews
            .iter()
            .rev()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect())
    }
}
