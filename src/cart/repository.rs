use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::cart::{CartError, CartItem, CartLineUpsert};

/// Per-user cart storage
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Insert the line, or replace quantity and price on an existing one
    async fn upsert(&self, line: CartLineUpsert) -> Result<CartItem, CartError>;

    async fn list(&self, user_id: i32) -> Result<Vec<CartItem>, CartError>;

    /// Remove one of the user's lines; false if it did not exist or belongs to someone else
    async fn remove(&self, user_id: i32, item_id: i32) -> Result<bool, CartError>;
}

/// PostgreSQL-backed cart
#[derive(Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn upsert(&self, line: CartLineUpsert) -> Result<CartItem, CartError> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (user_id, product_id, product_variation_id, quantity, price)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, product_id, (COALESCE(product_variation_id, 0)))
            DO UPDATE SET quantity = EXCLUDED.quantity,
                          price = EXCLUDED.price,
                          updated_at = NOW()
            RETURNING id, user_id, product_id, product_variation_id, quantity, price, created_at, updated_at
            "#,
        )
        .bind(line.user_id)
        .bind(line.product_id)
        .bind(line.product_variation_id)
        .bind(line.quantity)
        .bind(line.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    async fn list(&self, user_id: i32) -> Result<Vec<CartItem>, CartError> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, user_id, product_id, product_variation_id, quantity, price, created_at, updated_at
            FROM cart_items
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn remove(&self, user_id: i32, item_id: i32) -> Result<bool, CartError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Empty a user's cart on an open connection
///
/// Only called from the checkout transaction, right before commit, so a
/// failed checkout leaves the cart untouched.
pub async fn clear_cart(conn: &mut PgConnection, user_id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}
