use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::is_unique_violation;
use crate::reviews::{Review, ReviewError};

/// Storage for product reviews
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Whether one of the user's delivered orders contains the product
    async fn has_delivered_purchase(&self, user_id: i32, product_id: i32)
        -> Result<bool, ReviewError>;

    /// Create a review; a second review of the same product is `Duplicate`
    async fn create(
        &self,
        user_id: i32,
        product_id: i32,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review, ReviewError>;

    /// Reviews of a product, newest first
    async fn list_for_product(&self, product_id: i32) -> Result<Vec<Review>, ReviewError>;
}

/// Repository for database operations on reviews
#[derive(Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn has_delivered_purchase(
        &self,
        user_id: i32,
        product_id: i32,
    ) -> Result<bool, ReviewError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM orders o
                JOIN order_items oi ON oi.order_id = o.id
                WHERE o.user_id = $1 AND oi.product_id = $2 AND o.status = 'delivered'
            )
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(
        &self,
        user_id: i32,
        product_id: i32,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review, ReviewError> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (user_id, product_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, product_id, rating, comment, created_at
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "uq_reviews_user_product") {
                ReviewError::Duplicate(product_id)
            } else {
                ReviewError::DatabaseError(e)
            }
        })
    }

    async fn list_for_product(&self, product_id: i32) -> Result<Vec<Review>, ReviewError> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, user_id, product_id, rating, comment, created_at
            FROM reviews
            WHERE product_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }
}
