// Pricing Resolver
//
// Computes the unit price of a cart or order line from the product or
// variation record and its discount fields. Pure: it reads only its inputs.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::catalog::{DiscountType, Product, ProductVariation};

/// The price-related fields shared by products and variations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceFields {
    /// Plain price before any discount
    pub price: Decimal,
    /// Pre-computed discounted price (sale price / discount price)
    pub precomputed: Option<Decimal>,
    pub discount_type: DiscountType,
    pub discount: Decimal,
}

impl PriceFields {
    pub fn of_product(product: &Product) -> Self {
        Self {
            price: product.base_price,
            precomputed: product.sale_price,
            discount_type: product.discount_type,
            discount: product.discount_amount,
        }
    }

    pub fn of_variation(product: &Product, variation: &ProductVariation) -> Self {
        Self {
            price: PricingResolver::variation_price(product, variation),
            precomputed: variation.discount_price,
            discount_type: variation.discount_type,
            discount: variation.discount_amount,
        }
    }
}

/// Resolves line-item unit prices
pub struct PricingResolver;

impl PricingResolver {
    /// Unit price for a product, or for one of its variations when given
    ///
    /// The caller is responsible for checking that the variation belongs to
    /// the product.
    pub fn resolve(product: &Product, variation: Option<&ProductVariation>) -> Decimal {
        let fields = match variation {
            Some(variation) => PriceFields::of_variation(product, variation),
            None => PriceFields::of_product(product),
        };
        Self::apply(fields)
    }

    /// Apply the discount rules to a set of price fields
    ///
    /// Rule order:
    /// 1. a positive pre-computed price wins
    /// 2. percent discount: `price * (100 - discount) / 100`
    /// 3. flat discount: `price - discount`
    /// 4. otherwise the plain price
    ///
    /// The result is never negative.
    pub fn apply(fields: PriceFields) -> Decimal {
        if let Some(precomputed) = fields.precomputed {
            if precomputed > Decimal::ZERO {
                return precomputed;
            }
        }

        let resolved = if fields.discount > Decimal::ZERO {
            match fields.discount_type {
                DiscountType::Percent => {
                    (fields.price * (Decimal::ONE_HUNDRED - fields.discount) / Decimal::ONE_HUNDRED)
                        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                }
                DiscountType::Flat => fields.price - fields.discount,
                DiscountType::None => fields.price,
            }
        } else {
            fields.price
        };

        resolved.max(Decimal::ZERO)
    }

    /// Undiscounted price of a variation
    ///
    /// An absolute variation price wins; otherwise the modifier is added to
    /// the product's base price.
    pub fn variation_price(product: &Product, variation: &ProductVariation) -> Decimal {
        match (variation.price, variation.price_modifier) {
            (Some(price), _) => price,
            (None, Some(modifier)) => product.base_price + modifier,
            (None, None) => product.base_price,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub fn product(base_price: Decimal) -> Product {
        Product {
            id: 1,
            name: "Linen Shirt".to_string(),
            base_price,
            sale_price: None,
            discount_amount: Decimal::ZERO,
            discount_type: DiscountType::None,
            stock_quantity: 10,
        }
    }

    pub fn variation(product_id: i32) -> ProductVariation {
        ProductVariation {
            id: 11,
            product_id,
            size: Some("M".to_string()),
            color: Some("Blue".to_string()),
            price: None,
            price_modifier: None,
            discount_price: None,
            discount_amount: Decimal::ZERO,
            discount_type: DiscountType::None,
            stock_quantity: 10,
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn discount_type_strategy() -> impl Strategy<Value = DiscountType> {
        prop_oneof![
            Just(DiscountType::None),
            Just(DiscountType::Percent),
            Just(DiscountType::Flat),
        ]
    }

    /// Resolved prices are never negative for any combination of inputs
    #[test]
    fn prop_resolved_price_is_non_negative() {
        proptest!(|(
            price_cents in 0i64..=10_000_000,
            discount_cents in -100_000i64..=10_000_000,
            discount_type in discount_type_strategy(),
            precomputed_cents in proptest::option::of(-10_000i64..=1_000_000),
        )| {
            let fields = PriceFields {
                price: Decimal::new(price_cents, 2),
                precomputed: precomputed_cents.map(|c| Decimal::new(c, 2)),
                discount_type,
                discount: Decimal::new(discount_cents, 2),
            };
            let resolved = PricingResolver::apply(fields);
            prop_assert!(resolved >= Decimal::ZERO, "resolved price was {}", resolved);
        });
    }

    /// With no discount type or a zero discount the plain price comes back unchanged
    #[test]
    fn prop_no_discount_returns_exact_price() {
        proptest!(|(
            price_cents in 0i64..=10_000_000,
            discount_cents in 0i64..=10_000,
            discount_type in discount_type_strategy(),
        )| {
            let price = Decimal::new(price_cents, 2);

            let none = PriceFields {
                price,
                precomputed: None,
                discount_type: DiscountType::None,
                discount: Decimal::new(discount_cents, 2),
            };
            prop_assert_eq!(PricingResolver::apply(none), price);

            let zero = PriceFields {
                price,
                precomputed: None,
                discount_type,
                discount: Decimal::ZERO,
            };
            prop_assert_eq!(PricingResolver::apply(zero), price);
        });
    }

    /// A discount never raises the price
    #[test]
    fn prop_discount_never_increases_price() {
        proptest!(|(
            price_cents in 0i64..=10_000_000,
            discount_cents in 0i64..=10_000_000,
            discount_type in discount_type_strategy(),
        )| {
            let price = Decimal::new(price_cents, 2);
            let fields = PriceFields {
                price,
                precomputed: None,
                discount_type,
                discount: Decimal::new(discount_cents, 2),
            };
            prop_assert!(PricingResolver::apply(fields) <= price);
        });
    }
}
