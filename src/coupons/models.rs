use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Coupon as defined by the promotions admin; read-only here
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    /// Percent off the subtotal; exclusive with `discount_amount`
    pub discount_rate: Option<Decimal>,
    /// Flat amount off the subtotal; exclusive with `discount_rate`
    pub discount_amount: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Total redemptions allowed across all users; None is unlimited
    pub usage_limit: Option<i32>,
    pub is_active: bool,
}

impl Coupon {
    pub fn discount(&self) -> Option<CouponDiscount> {
        match (self.discount_rate, self.discount_amount) {
            (Some(rate), _) => Some(CouponDiscount {
                kind: CouponDiscountKind::Percent,
                value: rate,
            }),
            (None, Some(amount)) => Some(CouponDiscount {
                kind: CouponDiscountKind::Amount,
                value: amount,
            }),
            (None, None) => None,
        }
    }
}

/// A user's reservation of a coupon for their next order
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppliedCoupon {
    pub id: i32,
    pub user_id: i32,
    pub coupon_id: i32,
    pub is_used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CouponDiscountKind {
    Percent,
    Amount,
}

/// Discount descriptor returned when a coupon is applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CouponDiscount {
    #[serde(rename = "type")]
    pub kind: CouponDiscountKind,
    pub value: Decimal,
}

/// An unexpired, unused reservation together with its coupon
#[derive(Debug, Clone)]
pub struct ActiveCoupon {
    pub applied: AppliedCoupon,
    pub coupon: Coupon,
}

/// Request DTO for POST /api/coupon/apply
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ApplyCouponRequest {
    #[validate(length(min = 1, max = 64, message = "Coupon code must be 1-64 characters"))]
    pub code: String,
}

/// Response DTO for GET /api/coupon/active
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActiveCouponResponse {
    pub code: String,
    pub discount: CouponDiscount,
    pub expires_at: DateTime<Utc>,
}
