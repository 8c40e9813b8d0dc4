use std::sync::Arc;

use crate::cart::{CartError, CartItem, CartLineUpsert, CartRepository};
use crate::catalog::{price_line, CatalogRepository};
use crate::validation::MAX_LINE_QUANTITY;

/// Cart business logic
///
/// The price written with each line is the resolved unit price at the
/// moment of the upsert. It is a display hint; checkout prices again.
#[derive(Clone)]
pub struct CartService {
    catalog: Arc<dyn CatalogRepository>,
    carts: Arc<dyn CartRepository>,
}

impl CartService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, carts: Arc<dyn CartRepository>) -> Self {
        Self { catalog, carts }
    }

    /// Add a line to the user's cart, or replace the quantity of an existing one
    ///
    /// Fails with ProductNotFound / VariationNotFound when the catalog does
    /// not know the product or the variation belongs to another product.
    pub async fn upsert(
        &self,
        user_id: i32,
        product_id: i32,
        variation_id: Option<i32>,
        quantity: i32,
    ) -> Result<CartItem, CartError> {
        if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let line = price_line(self.catalog.as_ref(), product_id, variation_id).await?;

        let item = self
            .carts
            .upsert(CartLineUpsert {
                user_id,
                product_id,
                product_variation_id: variation_id,
                quantity,
                price: line.unit_price,
            })
            .await?;

        tracing::debug!(
            "Cart line {} for user {}: product {} x{} at {}",
            item.id,
            user_id,
            product_id,
            quantity,
            item.price
        );
        Ok(item)
    }

    pub async fn list(&self, user_id: i32) -> Result<Vec<CartItem>, CartError> {
        self.carts.list(user_id).await
    }

    pub async fn remove(&self, user_id: i32, item_id: i32) -> Result<(), CartError> {
        if !self.carts.remove(user_id, item_id).await? {
            return Err(CartError::ItemNotFound(item_id));
        }
        Ok(())
    }
}
