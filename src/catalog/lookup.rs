use rust_decimal::Decimal;

use crate::catalog::{CatalogRepository, Product, ProductVariation};
use crate::pricing::PricingResolver;

#[derive(Debug, thiserror::Error)]
pub enum LineLookupError {
    #[error("Product not found: {0}")]
    ProductNotFound(i32),

    #[error("Variation {variation_id} not found for product {product_id}")]
    VariationNotFound { product_id: i32, variation_id: i32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A product (and optional variation) with its current unit price
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product: Product,
    pub variation: Option<ProductVariation>,
    pub unit_price: Decimal,
}

impl PricedLine {
    pub fn variation_snapshot(&self) -> Option<String> {
        self.variation.as_ref().and_then(ProductVariation::describe)
    }
}

/// Look up a product and optional variation and resolve the current unit price
///
/// A variation that exists but belongs to another product is reported as
/// not found.
pub async fn price_line(
    catalog: &dyn CatalogRepository,
    product_id: i32,
    variation_id: Option<i32>,
) -> Result<PricedLine, LineLookupError> {
    let product = catalog
        .find_product(product_id)
        .await?
        .ok_or(LineLookupError::ProductNotFound(product_id))?;

    let variation = match variation_id {
        Some(variation_id) => {
            let variation = catalog
                .find_variation(variation_id)
                .await?
                .filter(|v| v.product_id == product.id)
                .ok_or(LineLookupError::VariationNotFound {
                    product_id,
                    variation_id,
                })?;
            Some(variation)
        }
        None => None,
    };

    let unit_price = PricingResolver::resolve(&product, variation.as_ref());

    Ok(PricedLine {
        product,
        variation,
        unit_price,
    })
}
