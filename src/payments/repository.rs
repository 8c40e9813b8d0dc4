use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::orders::PaymentStatus;
use crate::payments::{GatewayKind, PaymentError, PaymentInfo, PaymentInfoStatus};

const PAYMENT_COLUMNS: &str =
    "id, transaction_id, user_id, gateway, amount, status, created_at, updated_at";

/// Values for a new, pending payment attempt
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub transaction_id: String,
    pub user_id: Option<i32>,
    pub gateway: GatewayKind,
    pub amount: Decimal,
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: NewPayment) -> Result<PaymentInfo, PaymentError>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentInfo>, PaymentError>;

    /// Move a pending payment to `status`
    ///
    /// Returns None when the payment is no longer pending. Orders linked to
    /// the payment get the matching payment status if they are still unpaid;
    /// their fulfillment status is never touched.
    async fn settle(
        &self,
        transaction_id: &str,
        status: PaymentInfoStatus,
    ) -> Result<Option<PaymentInfo>, PaymentError>;
}

#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create(&self, payment: NewPayment) -> Result<PaymentInfo, PaymentError> {
        let info = sqlx::query_as::<_, PaymentInfo>(&format!(
            r#"
            INSERT INTO payment_infos (transaction_id, user_id, gateway, amount, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(&payment.transaction_id)
        .bind(payment.user_id)
        .bind(payment.gateway)
        .bind(payment.amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(info)
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentInfo>, PaymentError> {
        let info = sqlx::query_as::<_, PaymentInfo>(&format!(
            "SELECT {} FROM payment_infos WHERE transaction_id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(info)
    }

    async fn settle(
        &self,
        transaction_id: &str,
        status: PaymentInfoStatus,
    ) -> Result<Option<PaymentInfo>, PaymentError> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken here is the one checkout reads under, so an
        // order committed first is updated below and one committed later
        // sees the settled status.
        let updated = sqlx::query_as::<_, PaymentInfo>(&format!(
            r#"
            UPDATE payment_infos
            SET status = $2, updated_at = NOW()
            WHERE transaction_id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(transaction_id)
        .bind(status)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(info) = updated else {
            return Ok(None);
        };

        if let Some(payment_status) = PaymentStatus::from_payment(status) {
            let orders = sqlx::query(
                r#"
                UPDATE orders
                SET payment_status = $2, updated_at = NOW()
                WHERE payment_id = $1 AND payment_status = 'unpaid'
                "#,
            )
            .bind(info.id)
            .bind(payment_status)
            .execute(&mut *tx)
            .await?;

            tracing::debug!(
                "Payment {} settled as {}; {} linked order(s) now {}",
                transaction_id,
                status,
                orders.rows_affected(),
                payment_status
            );
        }

        tx.commit().await?;
        Ok(Some(info))
    }
}
