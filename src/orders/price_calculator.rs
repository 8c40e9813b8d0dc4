use rust_decimal::Decimal;

/// Order totals, computed once at checkout and stored on the order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub total_price: Decimal,
}

/// Service for calculating order prices and subtotals
pub struct PriceCalculator;

impl PriceCalculator {
    /// Line total: quantity * unit price
    pub fn calculate_subtotal(quantity: i32, unit_price: Decimal) -> Decimal {
        Decimal::from(quantity) * unit_price
    }

    /// Sum of line totals
    pub fn calculate_total(subtotals: &[Decimal]) -> Decimal {
        subtotals.iter().sum()
    }

    /// Combine line totals, discount and shipping
    ///
    /// The discount is clamped to [0, subtotal], so the goods part of the
    /// total never goes below zero; shipping is added on top.
    pub fn totals(line_totals: &[Decimal], discount: Decimal, shipping_cost: Decimal) -> OrderTotals {
        let subtotal = Self::calculate_total(line_totals);
        let discount = discount.max(Decimal::ZERO).min(subtotal);
        let shipping_cost = shipping_cost.max(Decimal::ZERO);

        OrderTotals {
            subtotal,
            discount,
            shipping_cost,
            total_price: subtotal - discount + shipping_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_calculate_subtotal_basic() {
        assert_eq!(PriceCalculator::calculate_subtotal(2, dec!(990)), dec!(1980));
    }

    #[test]
    fn test_decimal_precision() {
        assert_eq!(PriceCalculator::calculate_subtotal(3, dec!(4.33)), dec!(12.99));
    }

    #[test]
    fn test_calculate_total_empty() {
        assert_eq!(PriceCalculator::calculate_total(&[]), dec!(0));
    }

    #[test]
    fn test_totals_with_coupon_and_shipping() {
        let totals = PriceCalculator::totals(&[dec!(1980)], dec!(198), dec!(100));
        assert_eq!(totals.subtotal, dec!(1980));
        assert_eq!(totals.discount, dec!(198));
        assert_eq!(totals.total_price, dec!(1882));
    }

    #[test]
    fn test_discount_larger_than_subtotal_clamps() {
        let totals = PriceCalculator::totals(&[dec!(50)], dec!(80), dec!(10));
        assert_eq!(totals.discount, dec!(50));
        assert_eq!(totals.total_price, dec!(10));
    }
}
