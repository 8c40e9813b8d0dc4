use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::coupons::{AppliedCoupon, Coupon, CouponEngine, CouponError};
use crate::db::is_unique_violation;

const COUPON_COLUMNS: &str = "id, code, discount_rate, discount_amount, valid_from, valid_until, usage_limit, is_active";
const APPLIED_COLUMNS: &str = "id, user_id, coupon_id, is_used, expires_at, created_at";

/// Coupon, reservation and usage storage
#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, CouponError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Coupon>, CouponError>;

    /// Redemptions of the coupon across all users
    async fn count_usages(&self, coupon_id: i32) -> Result<i64, CouponError>;

    async fn has_usage(&self, coupon_id: i32, user_id: i32) -> Result<bool, CouponError>;

    /// Unused, unexpired reservation of this coupon by this user
    async fn find_unused_reservation(
        &self,
        coupon_id: i32,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<AppliedCoupon>, CouponError>;

    /// Create a reservation, dropping any other unused reservation the user holds
    async fn reserve(
        &self,
        user_id: i32,
        coupon: &Coupon,
        expires_at: DateTime<Utc>,
    ) -> Result<AppliedCoupon, CouponError>;

    /// The user's unused, unexpired reservation
    async fn find_active(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<AppliedCoupon>, CouponError>;

    /// Delete the user's unused reservation, returning it if there was one
    async fn release(&self, user_id: i32) -> Result<Option<AppliedCoupon>, CouponError>;
}

#[derive(Clone)]
pub struct PgCouponRepository {
    pool: PgPool,
}

impl PgCouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CouponRepository for PgCouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, CouponError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupons WHERE code = $1",
            COUPON_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Coupon>, CouponError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupons WHERE id = $1",
            COUPON_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    async fn count_usages(&self, coupon_id: i32) -> Result<i64, CouponError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1")
            .bind(coupon_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn has_usage(&self, coupon_id: i32, user_id: i32) -> Result<bool, CouponError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2)",
        )
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_unused_reservation(
        &self,
        coupon_id: i32,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<AppliedCoupon>, CouponError> {
        let applied = sqlx::query_as::<_, AppliedCoupon>(&format!(
            r#"
            SELECT {} FROM applied_coupons
            WHERE coupon_id = $1 AND user_id = $2 AND is_used = FALSE AND expires_at > $3
            "#,
            APPLIED_COLUMNS
        ))
        .bind(coupon_id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(applied)
    }

    async fn reserve(
        &self,
        user_id: i32,
        coupon: &Coupon,
        expires_at: DateTime<Utc>,
    ) -> Result<AppliedCoupon, CouponError> {
        let mut tx = self.pool.begin().await?;

        // Expired rows of the same coupon would otherwise trip the partial unique index
        sqlx::query("DELETE FROM applied_coupons WHERE user_id = $1 AND is_used = FALSE")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let applied = sqlx::query_as::<_, AppliedCoupon>(&format!(
            r#"
            INSERT INTO applied_coupons (user_id, coupon_id, is_used, expires_at)
            VALUES ($1, $2, FALSE, $3)
            RETURNING {}
            "#,
            APPLIED_COLUMNS
        ))
        .bind(user_id)
        .bind(coupon.id)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            // a concurrent apply of the same code committed first
            if is_unique_violation(&e, "uq_applied_coupons_unused") {
                CouponError::AlreadyApplied(coupon.code.clone())
            } else {
                CouponError::DatabaseError(e)
            }
        })?;

        tx.commit().await?;
        Ok(applied)
    }

    async fn find_active(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<AppliedCoupon>, CouponError> {
        let applied = sqlx::query_as::<_, AppliedCoupon>(&format!(
            r#"
            SELECT {} FROM applied_coupons
            WHERE user_id = $1 AND is_used = FALSE AND expires_at > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            APPLIED_COLUMNS
        ))
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(applied)
    }

    async fn release(&self, user_id: i32) -> Result<Option<AppliedCoupon>, CouponError> {
        let released = sqlx::query_as::<_, AppliedCoupon>(&format!(
            r#"
            DELETE FROM applied_coupons
            WHERE user_id = $1 AND is_used = FALSE AND expires_at > NOW()
            RETURNING {}
            "#,
            APPLIED_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(released)
    }
}

/// Consume a reservation inside the checkout transaction
///
/// Locks the reservation and the coupon row, re-validates the coupon, flips
/// `is_used` with a conditional update and records the usage. Any error here
/// must abort the surrounding transaction.
pub async fn consume_reservation(
    conn: &mut PgConnection,
    applied_id: i32,
    user_id: i32,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Coupon, CouponError> {
    let applied = sqlx::query_as::<_, AppliedCoupon>(&format!(
        "SELECT {} FROM applied_coupons WHERE id = $1 AND user_id = $2 FOR UPDATE",
        APPLIED_COLUMNS
    ))
    .bind(applied_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .filter(|applied| !applied.is_used)
    .ok_or(CouponError::ReservationConsumed(applied_id))?;

    // Serializes redemptions of the same coupon so the usage limit holds
    let coupon = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {} FROM coupons WHERE id = $1 FOR UPDATE",
        COUPON_COLUMNS
    ))
    .bind(applied.coupon_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CouponError::NotFound(applied.coupon_id.to_string()))?;

    let usage_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1")
            .bind(coupon.id)
            .fetch_one(&mut *conn)
            .await?;
    CouponEngine::validate(&coupon, usage_count, now)?;

    let updated = sqlx::query(
        "UPDATE applied_coupons SET is_used = TRUE WHERE id = $1 AND is_used = FALSE",
    )
    .bind(applied.id)
    .execute(&mut *conn)
    .await?;
    if updated.rows_affected() != 1 {
        return Err(CouponError::ReservationConsumed(applied_id));
    }

    sqlx::query(
        "INSERT INTO coupon_usages (coupon_id, user_id, order_id, used_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(coupon.id)
    .bind(user_id)
    .bind(order_id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e, "uq_coupon_usages_coupon_user") {
            CouponError::AlreadyUsed(coupon.code.clone())
        } else {
            CouponError::DatabaseError(e)
        }
    })?;

    Ok(coupon)
}
