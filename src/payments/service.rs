use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::payments::{
    CallbackParams, GatewayRegistry, InitPaymentRequest, InitPaymentResponse, NewPayment,
    PaymentError, PaymentInfo, PaymentInfoStatus, PaymentOutcome, PaymentRepository,
    PaymentRequest,
};

/// Payment initiation and callback handling
#[derive(Clone)]
pub struct PaymentService {
    repo: Arc<dyn PaymentRepository>,
    gateways: GatewayRegistry,
    currency: String,
}

impl PaymentService {
    pub fn new(repo: Arc<dyn PaymentRepository>, gateways: GatewayRegistry, currency: String) -> Self {
        Self {
            repo,
            gateways,
            currency,
        }
    }

    /// Start a payment attempt
    ///
    /// The pending PaymentInfo row is written before the provider is called,
    /// so a transport failure leaves a pending record behind rather than a
    /// failed one: the provider may have accepted the payment anyway.
    pub async fn init(
        &self,
        user_id: Option<i32>,
        request: InitPaymentRequest,
    ) -> Result<InitPaymentResponse, PaymentError> {
        if request.amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(request.amount.to_string()));
        }

        let gateway = self.gateways.get(request.gateway)?;
        let transaction_id = new_transaction_id();

        let payment = self
            .repo
            .create(NewPayment {
                transaction_id: transaction_id.clone(),
                user_id,
                gateway: request.gateway,
                amount: request.amount,
            })
            .await?;

        let gateway_request = PaymentRequest {
            transaction_id: transaction_id.clone(),
            amount: request.amount,
            currency: self.currency.clone(),
            payer_name: request.user_name,
            payer_email: request.user_email,
            payer_phone: request.user_phone,
        };

        let session = match gateway.create_payment(&gateway_request).await {
            Ok(session) => session,
            Err(PaymentError::GatewayUnavailable {
                gateway, reason, ..
            }) => {
                warn!(
                    "Gateway {} unavailable for transaction {}: {}",
                    gateway, transaction_id, reason
                );
                return Err(PaymentError::GatewayUnavailable {
                    gateway,
                    transaction_id: Some(transaction_id),
                    reason,
                });
            }
            Err(e) => return Err(e),
        };

        let status = if session.status.is_terminal() {
            self.repo
                .settle(&transaction_id, session.status)
                .await?
                .map(|p| p.status)
                .unwrap_or(payment.status)
        } else {
            payment.status
        };

        info!(
            "Payment {} started via {} for {} ({})",
            transaction_id, request.gateway, request.amount, status
        );

        Ok(InitPaymentResponse {
            transaction_id,
            gateway: request.gateway,
            status,
            redirect_url: session.redirect_url,
        })
    }

    /// Record a gateway callback
    ///
    /// Only redirect-gateway payments settle here. A success callback must
    /// carry a validation handle the provider vouches for. Repeating the
    /// same outcome is a no-op; an outcome that contradicts an already
    /// terminal status is logged and ignored.
    pub async fn on_callback(
        &self,
        params: &CallbackParams,
        outcome: PaymentOutcome,
    ) -> Result<PaymentInfo, PaymentError> {
        let current = self.find(&params.tran_id).await?;
        if !current.gateway.settles_by_callback() {
            warn!(
                "Rejected {:?} callback for offline payment {}",
                outcome, current.transaction_id
            );
            return Err(PaymentError::CallbackNotAccepted(current.gateway));
        }

        let target = PaymentInfoStatus::from(outcome);

        if current.status == target {
            debug!("Repeated {} callback for {}", target, current.transaction_id);
            return Ok(current);
        }

        if current.status.is_terminal() {
            warn!(
                "Ignoring {} callback for {}: payment already {}",
                target, current.transaction_id, current.status
            );
            return Ok(current);
        }

        if target == PaymentInfoStatus::Complete {
            self.verify_success(&current, params.val_id.as_deref()).await?;
        }

        self.settle(&current.transaction_id, target).await
    }

    /// Admin settlement of a cash-on-delivery or bank-transfer payment
    pub async fn confirm_offline(
        &self,
        transaction_id: &str,
        target: PaymentInfoStatus,
    ) -> Result<PaymentInfo, PaymentError> {
        if !target.is_terminal() {
            return Err(PaymentError::InvalidSettlement(target));
        }

        let current = self.find(transaction_id).await?;
        if current.gateway.settles_by_callback() {
            return Err(PaymentError::ManualSettlementNotAllowed(current.gateway));
        }

        if current.status == target {
            return Ok(current);
        }
        if current.status.is_terminal() {
            return Err(PaymentError::AlreadySettled {
                transaction_id: current.transaction_id,
                status: current.status,
            });
        }

        self.settle(transaction_id, target).await
    }

    /// The provider must confirm the same transaction for at least the recorded amount
    async fn verify_success(
        &self,
        payment: &PaymentInfo,
        validation_id: Option<&str>,
    ) -> Result<(), PaymentError> {
        let Some(validation_id) = validation_id.filter(|id| !id.trim().is_empty()) else {
            warn!("Success callback for {} carried no val_id", payment.transaction_id);
            return Err(PaymentError::Unverified(payment.transaction_id.clone()));
        };

        let validation = self
            .gateways
            .get(payment.gateway)?
            .validate(validation_id)
            .await?;

        if !validation.valid
            || validation.transaction_id != payment.transaction_id
            || validation.amount < payment.amount
        {
            warn!(
                "Gateway did not vouch for {}: valid={}, tran_id={}, amount={} (expected {})",
                payment.transaction_id,
                validation.valid,
                validation.transaction_id,
                validation.amount,
                payment.amount
            );
            return Err(PaymentError::Unverified(payment.transaction_id.clone()));
        }

        Ok(())
    }

    async fn settle(
        &self,
        transaction_id: &str,
        target: PaymentInfoStatus,
    ) -> Result<PaymentInfo, PaymentError> {
        match self.repo.settle(transaction_id, target).await? {
            Some(updated) => {
                info!("Payment {} is now {}", transaction_id, updated.status);
                Ok(updated)
            }
            // a concurrent settlement won
            None => self.find(transaction_id).await,
        }
    }

    pub async fn find(&self, transaction_id: &str) -> Result<PaymentInfo, PaymentError> {
        self.repo
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(transaction_id.to_string()))
    }

    /// Look up a payment on behalf of a caller; user-owned payments are private
    pub async fn find_for(
        &self,
        transaction_id: &str,
        caller: Option<i32>,
    ) -> Result<PaymentInfo, PaymentError> {
        let payment = self.find(transaction_id).await?;

        match payment.user_id {
            Some(owner) if Some(owner) != caller => Err(PaymentError::Forbidden(
                "Payment belongs to another user".to_string(),
            )),
            _ => Ok(payment),
        }
    }
}

/// Locally generated correlation id handed to the gateway
fn new_transaction_id() -> String {
    format!("TXN-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::payments::gateway::test_fixtures::{vouched, VouchingGateway};
    use crate::payments::{GatewayKind, GatewaySession, PaymentGateway};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct DownGateway;

    #[async_trait]
    impl PaymentGateway for DownGateway {
        fn kind(&self) -> GatewayKind {
            GatewayKind::Hosted
        }

        async fn create_payment(&self, _: &PaymentRequest) -> Result<GatewaySession, PaymentError> {
            Err(PaymentError::unavailable(GatewayKind::Hosted, "connection refused"))
        }
    }

    fn service(store: &Arc<MemoryStore>, gateways: GatewayRegistry) -> PaymentService {
        PaymentService::new(store.clone(), gateways, "BDT".to_string())
    }

    fn with_hosted() -> GatewayRegistry {
        GatewayRegistry::offline().with(Arc::new(VouchingGateway))
    }

    fn init_request(gateway: GatewayKind) -> InitPaymentRequest {
        InitPaymentRequest {
            gateway,
            amount: dec!(1882),
            user_name: "Rahim".to_string(),
            user_email: "rahim@example.com".to_string(),
            user_phone: None,
        }
    }

    fn callback(tran_id: &str, val_id: Option<String>) -> CallbackParams {
        CallbackParams {
            tran_id: tran_id.to_string(),
            val_id,
        }
    }

    #[tokio::test]
    async fn test_init_offline_creates_pending_record() {
        let store = Arc::new(MemoryStore::default());
        let payments = service(&store, GatewayRegistry::offline());

        let response = payments
            .init(Some(7), init_request(GatewayKind::CashOnDelivery))
            .await
            .unwrap();

        assert_eq!(response.status, PaymentInfoStatus::Pending);
        assert!(response.redirect_url.is_none());
        let stored = payments.find(&response.transaction_id).await.unwrap();
        assert_eq!(stored.amount, dec!(1882));
        assert_eq!(stored.user_id, Some(7));
    }

    #[tokio::test]
    async fn test_unavailable_gateway_leaves_pending_record() {
        let store = Arc::new(MemoryStore::default());
        let payments = service(
            &store,
            GatewayRegistry::default().with(Arc::new(DownGateway)),
        );

        let result = payments.init(None, init_request(GatewayKind::Hosted)).await;

        let Err(PaymentError::GatewayUnavailable {
            transaction_id: Some(transaction_id),
            ..
        }) = result
        else {
            panic!("expected GatewayUnavailable with a transaction id");
        };
        let stored = payments.find(&transaction_id).await.unwrap();
        assert_eq!(stored.status, PaymentInfoStatus::Pending);
    }

    #[tokio::test]
    async fn test_init_rejects_non_positive_amount() {
        let store = Arc::new(MemoryStore::default());
        let mut request = init_request(GatewayKind::CashOnDelivery);
        request.amount = dec!(0);

        let result = service(&store, GatewayRegistry::offline())
            .init(None, request)
            .await;

        assert!(matches!(result, Err(PaymentError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_repeated_callback_is_idempotent() {
        let store = Arc::new(MemoryStore::default());
        let payments = service(&store, with_hosted());
        let started = payments
            .init(None, init_request(GatewayKind::Hosted))
            .await
            .unwrap();
        let params = callback(
            &started.transaction_id,
            Some(vouched(&started.transaction_id, "1882")),
        );

        let first = payments
            .on_callback(&params, PaymentOutcome::Success)
            .await
            .unwrap();
        let second = payments
            .on_callback(&params, PaymentOutcome::Success)
            .await
            .unwrap();

        assert_eq!(first.status, PaymentInfoStatus::Complete);
        assert_eq!(second.status, PaymentInfoStatus::Complete);
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn test_conflicting_callback_does_not_overwrite() {
        let store = Arc::new(MemoryStore::default());
        let payments = service(&store, with_hosted());
        let started = payments
            .init(None, init_request(GatewayKind::Hosted))
            .await
            .unwrap();

        payments
            .on_callback(
                &callback(&started.transaction_id, Some(vouched(&started.transaction_id, "1882"))),
                PaymentOutcome::Success,
            )
            .await
            .unwrap();
        let late = payments
            .on_callback(&callback(&started.transaction_id, None), PaymentOutcome::Failure)
            .await
            .unwrap();

        assert_eq!(late.status, PaymentInfoStatus::Complete);
    }

    #[tokio::test]
    async fn test_success_callback_needs_gateway_validation() {
        let store = Arc::new(MemoryStore::default());
        let payments = service(&store, with_hosted());
        let started = payments
            .init(None, init_request(GatewayKind::Hosted))
            .await
            .unwrap();
        let tran_id = started.transaction_id.as_str();

        for val_id in [
            None,
            Some("forged".to_string()),
            Some(vouched("TXN-SOMEONE-ELSE", "1882")),
            Some(vouched(tran_id, "1")),
        ] {
            let result = payments
                .on_callback(&callback(tran_id, val_id), PaymentOutcome::Success)
                .await;
            assert!(matches!(result, Err(PaymentError::Unverified(_))));
        }

        assert_eq!(
            payments.find(tran_id).await.unwrap().status,
            PaymentInfoStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_fail_callback_settles_without_validation() {
        let store = Arc::new(MemoryStore::default());
        let payments = service(&store, with_hosted());
        let started = payments
            .init(None, init_request(GatewayKind::Hosted))
            .await
            .unwrap();

        let failed = payments
            .on_callback(&callback(&started.transaction_id, None), PaymentOutcome::Failure)
            .await
            .unwrap();

        assert_eq!(failed.status, PaymentInfoStatus::Failed);
    }

    #[tokio::test]
    async fn test_callback_cannot_settle_offline_payment() {
        let store = Arc::new(MemoryStore::default());
        let payments = service(&store, with_hosted());
        let started = payments
            .init(Some(7), init_request(GatewayKind::CashOnDelivery))
            .await
            .unwrap();

        let result = payments
            .on_callback(
                &callback(&started.transaction_id, Some(vouched(&started.transaction_id, "1882"))),
                PaymentOutcome::Success,
            )
            .await;

        assert!(matches!(
            result,
            Err(PaymentError::CallbackNotAccepted(GatewayKind::CashOnDelivery))
        ));
        assert_eq!(
            payments.find(&started.transaction_id).await.unwrap().status,
            PaymentInfoStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_callback_for_unknown_transaction() {
        let store = Arc::new(MemoryStore::default());

        let result = service(&store, GatewayRegistry::offline())
            .on_callback(&callback("TXN-NOPE", None), PaymentOutcome::Success)
            .await;

        assert!(matches!(result, Err(PaymentError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_confirms_offline_payment() {
        let store = Arc::new(MemoryStore::default());
        let payments = service(&store, GatewayRegistry::offline());
        let started = payments
            .init(Some(7), init_request(GatewayKind::BankTransfer))
            .await
            .unwrap();
        let tran_id = started.transaction_id.as_str();

        assert!(matches!(
            payments.confirm_offline(tran_id, PaymentInfoStatus::Pending).await,
            Err(PaymentError::InvalidSettlement(PaymentInfoStatus::Pending))
        ));

        let confirmed = payments
            .confirm_offline(tran_id, PaymentInfoStatus::Complete)
            .await
            .unwrap();
        assert_eq!(confirmed.status, PaymentInfoStatus::Complete);

        let again = payments
            .confirm_offline(tran_id, PaymentInfoStatus::Complete)
            .await
            .unwrap();
        assert_eq!(again.updated_at, confirmed.updated_at);

        assert!(matches!(
            payments.confirm_offline(tran_id, PaymentInfoStatus::Failed).await,
            Err(PaymentError::AlreadySettled { .. })
        ));
    }

    #[tokio::test]
    async fn test_admin_cannot_settle_hosted_payment() {
        let store = Arc::new(MemoryStore::default());
        let payments = service(&store, with_hosted());
        let started = payments
            .init(None, init_request(GatewayKind::Hosted))
            .await
            .unwrap();

        let result = payments
            .confirm_offline(&started.transaction_id, PaymentInfoStatus::Complete)
            .await;

        assert!(matches!(
            result,
            Err(PaymentError::ManualSettlementNotAllowed(GatewayKind::Hosted))
        ));
    }

    #[tokio::test]
    async fn test_other_users_payment_is_forbidden() {
        let store = Arc::new(MemoryStore::default());
        let payments = service(&store, GatewayRegistry::offline());
        let started = payments
            .init(Some(7), init_request(GatewayKind::CashOnDelivery))
            .await
            .unwrap();

        assert!(payments.find_for(&started.transaction_id, Some(7)).await.is_ok());
        assert!(matches!(
            payments.find_for(&started.transaction_id, Some(8)).await,
            Err(PaymentError::Forbidden(_))
        ));
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        assert_ne!(new_transaction_id(), new_transaction_id());
        assert!(new_transaction_id().starts_with("TXN-"));
    }
}
