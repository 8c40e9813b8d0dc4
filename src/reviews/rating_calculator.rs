use rust_decimal::{Decimal, RoundingStrategy};

/// Calculator for average product ratings
pub struct RatingCalculator;

impl RatingCalculator {
    /// Arithmetic mean of the ratings, rounded to one decimal
    ///
    /// Returns None when there are no ratings.
    pub fn average(ratings: &[i16]) -> Option<Decimal> {
        if ratings.is_empty() {
            return None;
        }

        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        let average = Decimal::from(sum) / Decimal::from(ratings.len() as i64);
        Some(average.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The average always lies within the 1..=5 rating range
        #[test]
        fn prop_average_within_bounds(ratings in prop::collection::vec(1i16..=5, 1..50)) {
            let average = RatingCalculator::average(&ratings).unwrap();
            prop_assert!(average >= Decimal::ONE);
            prop_assert!(average <= Decimal::from(5));
        }
    }
}
