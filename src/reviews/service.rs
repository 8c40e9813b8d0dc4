use std::sync::Arc;

use crate::catalog::CatalogRepository;
use crate::reviews::{
    CreateReviewRequest, ProductReviewsResponse, RatingCalculator, Review, ReviewError,
    ReviewRepository,
};

/// Service layer for review business logic
#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { reviews, catalog }
    }

    /// Create a new review
    ///
    /// This method:
    /// 1. Verifies the product exists
    /// 2. Requires a delivered order of this user containing the product
    /// 3. Creates the review (one per user and product)
    pub async fn create_review(
        &self,
        user_id: i32,
        request: CreateReviewRequest,
    ) -> Result<Review, ReviewError> {
        self.ensure_product(request.product_id).await?;

        if !self
            .reviews
            .has_delivered_purchase(user_id, request.product_id)
            .await?
        {
            return Err(ReviewError::NotEligible(request.product_id));
        }

        let review = self
            .reviews
            .create(user_id, request.product_id, request.rating, request.comment)
            .await?;

        tracing::info!(
            "User {} reviewed product {} ({} stars)",
            user_id,
            review.product_id,
            review.rating
        );
        Ok(review)
    }

    /// Reviews of a product with the average rating
    pub async fn get_product_reviews(
        &self,
        product_id: i32,
    ) -> Result<ProductReviewsResponse, ReviewError> {
        self.ensure_product(product_id).await?;

        let reviews = self.reviews.list_for_product(product_id).await?;
        let ratings: Vec<i16> = reviews.iter().map(|r| r.rating).collect();

        Ok(ProductReviewsResponse {
            product_id,
            average_rating: RatingCalculator::average(&ratings),
            review_count: reviews.len(),
            reviews: reviews.into_iter().map(Into::into).collect(),
        })
    }

    async fn ensure_product(&self, product_id: i32) -> Result<(), ReviewError> {
        self.catalog
            .find_product(product_id)
            .await?
            .map(|_| ())
            .ok_or(ReviewError::ProductNotFound(product_id))
    }
}
