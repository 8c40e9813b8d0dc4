use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::coupons::{
    ActiveCoupon, AppliedCoupon, Coupon, CouponDiscount, CouponDiscountKind, CouponError,
    CouponRepository,
};

/// Coupon validation and reservation
///
/// A (coupon, user) pair moves none-applied -> applied (unused) -> consumed.
/// Consumption happens inside the checkout transaction, see
/// `coupons::repository::consume_reservation`.
#[derive(Clone)]
pub struct CouponEngine {
    repo: Arc<dyn CouponRepository>,
    reservation_ttl: Duration,
}

impl CouponEngine {
    pub fn new(repo: Arc<dyn CouponRepository>, reservation_ttl: Duration) -> Self {
        Self {
            repo,
            reservation_ttl,
        }
    }

    /// Reserve a coupon for the user's next order
    ///
    /// Checks run in order: unknown code, validity window and usage limit,
    /// prior usage by this user, existing unused reservation. A reservation
    /// of a different coupon is replaced.
    pub async fn apply(&self, code: &str, user_id: i32) -> Result<CouponDiscount, CouponError> {
        let code = code.trim();
        let now = Utc::now();

        let coupon = self
            .repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| CouponError::NotFound(code.to_string()))?;

        let usage_count = self.repo.count_usages(coupon.id).await?;
        let discount = Self::validate(&coupon, usage_count, now)?;

        if self.repo.has_usage(coupon.id, user_id).await? {
            return Err(CouponError::AlreadyUsed(coupon.code));
        }

        if self
            .repo
            .find_unused_reservation(coupon.id, user_id, now)
            .await?
            .is_some()
        {
            return Err(CouponError::AlreadyApplied(coupon.code));
        }

        let applied = self
            .repo
            .reserve(user_id, &coupon, now + self.reservation_ttl)
            .await?;

        tracing::info!(
            "User {} applied coupon {} (reservation {}, expires {})",
            user_id,
            coupon.code,
            applied.id,
            applied.expires_at
        );
        Ok(discount)
    }

    /// The user's single unexpired, unused reservation, if any
    pub async fn resolve_active(&self, user_id: i32) -> Result<Option<ActiveCoupon>, CouponError> {
        let Some(applied) = self.repo.find_active(user_id, Utc::now()).await? else {
            return Ok(None);
        };

        // coupon rows are never deleted while reservations reference them (FK cascade)
        let coupon = self
            .repo
            .find_by_id(applied.coupon_id)
            .await?
            .ok_or_else(|| CouponError::NotFound(applied.coupon_id.to_string()))?;

        Ok(Some(ActiveCoupon { applied, coupon }))
    }

    /// Re-check an active reservation right before checkout
    pub async fn revalidate(&self, active: &ActiveCoupon) -> Result<CouponDiscount, CouponError> {
        let usage_count = self.repo.count_usages(active.coupon.id).await?;
        let discount = Self::validate(&active.coupon, usage_count, Utc::now())?;

        if self
            .repo
            .has_usage(active.coupon.id, active.applied.user_id)
            .await?
        {
            return Err(CouponError::AlreadyUsed(active.coupon.code.clone()));
        }

        Ok(discount)
    }

    /// Drop the user's unused reservation
    pub async fn release(&self, user_id: i32) -> Result<AppliedCoupon, CouponError> {
        let released = self
            .repo
            .release(user_id)
            .await?
            .ok_or(CouponError::NoActiveCoupon)?;

        tracing::info!("User {} released coupon reservation {}", user_id, released.id);
        Ok(released)
    }

    /// Check a coupon's own applicability at `now`
    ///
    /// `usage_count` is the number of redemptions across all users.
    pub fn validate(
        coupon: &Coupon,
        usage_count: i64,
        now: DateTime<Utc>,
    ) -> Result<CouponDiscount, CouponError> {
        let invalid = |reason: &str| CouponError::Invalid {
            code: coupon.code.clone(),
            reason: reason.to_string(),
        };

        if !coupon.is_active {
            return Err(invalid("coupon is disabled"));
        }
        if coupon.valid_from.is_some_and(|from| now < from) {
            return Err(invalid("coupon is not valid yet"));
        }
        if coupon.valid_until.is_some_and(|until| now > until) {
            return Err(invalid("coupon has expired"));
        }
        if coupon
            .usage_limit
            .is_some_and(|limit| usage_count >= i64::from(limit))
        {
            return Err(invalid("usage limit reached"));
        }

        coupon
            .discount()
            .ok_or_else(|| invalid("coupon has no discount configured"))
    }

    /// Discount for a subtotal; never more than the subtotal, never negative
    pub fn discount_for(discount: &CouponDiscount, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO || discount.value <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let amount = match discount.kind {
            CouponDiscountKind::Percent => (subtotal * discount.value / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            CouponDiscountKind::Amount => discount.value,
        };

        amount.min(subtotal)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn money() -> impl Strategy<Value = Decimal> {
        (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #[test]
        fn prop_discount_never_exceeds_subtotal(
            subtotal in money(),
            value in money(),
            percent in any::<bool>(),
        ) {
            let discount = CouponDiscount {
                kind: if percent { CouponDiscountKind::Percent } else { CouponDiscountKind::Amount },
                value,
            };
            let amount = CouponEngine::discount_for(&discount, subtotal);
            prop_assert!(amount >= Decimal::ZERO);
            prop_assert!(amount <= subtotal);
        }
    }
}
