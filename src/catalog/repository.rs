use async_trait::async_trait;
use sqlx::PgPool;

use crate::catalog::{Product, ProductVariation};

/// Read access to the catalog owned by catalog management
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_product(&self, id: i32) -> Result<Option<Product>, sqlx::Error>;

    async fn find_variation(&self, id: i32) -> Result<Option<ProductVariation>, sqlx::Error>;
}

/// PostgreSQL-backed catalog lookups
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn find_product(&self, id: i32) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, base_price, sale_price, discount_amount, discount_type, stock_quantity
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_variation(&self, id: i32) -> Result<Option<ProductVariation>, sqlx::Error> {
        sqlx::query_as::<_, ProductVariation>(
            r#"
            SELECT id, product_id, size, color, price, price_modifier, discount_price,
                   discount_amount, discount_type, stock_quantity
            FROM product_variations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
