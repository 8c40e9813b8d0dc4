// Payment gateway adapters

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::HostedGatewayConfig;
use crate::payments::{
    GatewayKind, GatewaySession, GatewayValidation, PaymentError, PaymentInfoStatus, PaymentRequest,
};

/// Starts a payment attempt with an external provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn kind(&self) -> GatewayKind;

    /// Errors only with `GatewayUnavailable` when the provider cannot be
    /// reached or answers with something unparseable.
    async fn create_payment(&self, request: &PaymentRequest) -> Result<GatewaySession, PaymentError>;

    /// Ask the provider whether a success callback is genuine
    ///
    /// Gateways that never call back have nothing to validate.
    async fn validate(&self, _validation_id: &str) -> Result<GatewayValidation, PaymentError> {
        Err(PaymentError::CallbackNotAccepted(self.kind()))
    }
}

/// Cash on delivery and bank transfer: no provider call, an admin confirms later
pub struct OfflineGateway {
    kind: GatewayKind,
}

impl OfflineGateway {
    pub fn cash_on_delivery() -> Self {
        Self {
            kind: GatewayKind::CashOnDelivery,
        }
    }

    pub fn bank_transfer() -> Self {
        Self {
            kind: GatewayKind::BankTransfer,
        }
    }
}

#[async_trait]
impl PaymentGateway for OfflineGateway {
    fn kind(&self) -> GatewayKind {
        self.kind
    }

    async fn create_payment(&self, request: &PaymentRequest) -> Result<GatewaySession, PaymentError> {
        debug!(
            "Offline payment {} via {} awaits manual confirmation",
            request.transaction_id, self.kind
        );
        Ok(GatewaySession {
            status: PaymentInfoStatus::Pending,
            redirect_url: None,
        })
    }
}

#[derive(Debug, Serialize)]
struct HostedInitRequest<'a> {
    store_id: &'a str,
    store_passwd: &'a str,
    total_amount: String,
    currency: &'a str,
    tran_id: &'a str,
    success_url: String,
    fail_url: String,
    cancel_url: String,
    cus_name: &'a str,
    cus_email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cus_phone: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct HostedValidationQuery<'a> {
    val_id: &'a str,
    store_id: &'a str,
    store_passwd: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct HostedValidationResponse {
    status: String,
    #[serde(default)]
    tran_id: Option<String>,
    #[serde(default)]
    amount: Option<rust_decimal::Decimal>,
}

#[derive(Debug, Deserialize)]
struct HostedInitResponse {
    status: String,
    #[serde(default, alias = "GatewayPageURL")]
    redirect_url: Option<String>,
    #[serde(default, alias = "failedreason")]
    failed_reason: Option<String>,
}

/// Redirect-based hosted checkout page
///
/// The provider answers the init call with a page URL; the outcome arrives
/// later on the success/fail/cancel callbacks, and success is confirmed
/// through the provider's validation endpoint.
pub struct HostedCheckoutGateway {
    client: reqwest::Client,
    config: HostedGatewayConfig,
    callback_base: String,
}

impl HostedCheckoutGateway {
    pub fn new(
        config: HostedGatewayConfig,
        public_base_url: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            config,
            callback_base: format!("{}/api/payment", public_base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Hosted
    }

    async fn create_payment(&self, request: &PaymentRequest) -> Result<GatewaySession, PaymentError> {
        let body = HostedInitRequest {
            store_id: &self.config.store_id,
            store_passwd: &self.config.store_password,
            total_amount: request.amount.to_string(),
            currency: &request.currency,
            tran_id: &request.transaction_id,
            success_url: format!("{}/success", self.callback_base),
            fail_url: format!("{}/fail", self.callback_base),
            cancel_url: format!("{}/cancel", self.callback_base),
            cus_name: &request.payer_name,
            cus_email: &request.payer_email,
            cus_phone: request.payer_phone.as_deref(),
        };

        let response = self
            .client
            .post(&self.config.init_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::unavailable(GatewayKind::Hosted, e))?;

        if !response.status().is_success() {
            return Err(PaymentError::unavailable(
                GatewayKind::Hosted,
                format!("init returned HTTP {}", response.status()),
            ));
        }

        let init: HostedInitResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::unavailable(GatewayKind::Hosted, e))?;

        match (init.status.to_ascii_uppercase().as_str(), init.redirect_url) {
            ("SUCCESS", Some(url)) if !url.is_empty() => Ok(GatewaySession {
                status: PaymentInfoStatus::Pending,
                redirect_url: Some(url),
            }),
            ("FAILED", _) => {
                warn!(
                    "Hosted gateway declined {}: {}",
                    request.transaction_id,
                    init.failed_reason.as_deref().unwrap_or("no reason given")
                );
                Ok(GatewaySession {
                    status: PaymentInfoStatus::Failed,
                    redirect_url: None,
                })
            }
            (status, _) => Err(PaymentError::unavailable(
                GatewayKind::Hosted,
                format!("unexpected init response status '{}'", status),
            )),
        }
    }

    async fn validate(&self, validation_id: &str) -> Result<GatewayValidation, PaymentError> {
        let query = HostedValidationQuery {
            val_id: validation_id,
            store_id: &self.config.store_id,
            store_passwd: &self.config.store_password,
            format: "json",
        };

        let response = self
            .client
            .get(&self.config.validation_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| PaymentError::unavailable(GatewayKind::Hosted, e))?;

        if !response.status().is_success() {
            return Err(PaymentError::unavailable(
                GatewayKind::Hosted,
                format!("validation returned HTTP {}", response.status()),
            ));
        }

        let validation: HostedValidationResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::unavailable(GatewayKind::Hosted, e))?;

        let valid = matches!(
            validation.status.to_ascii_uppercase().as_str(),
            "VALID" | "VALIDATED"
        );
        debug!(
            "Hosted gateway validation {} answered {}",
            validation_id, validation.status
        );

        Ok(GatewayValidation {
            transaction_id: validation.tran_id.unwrap_or_default(),
            amount: validation.amount.unwrap_or_default(),
            valid,
        })
    }
}

/// Gateways available to this deployment, keyed by kind
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<GatewayKind, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    /// Cash on delivery and bank transfer, which need no configuration
    pub fn offline() -> Self {
        Self::default()
            .with(Arc::new(OfflineGateway::cash_on_delivery()))
            .with(Arc::new(OfflineGateway::bank_transfer()))
    }

    pub fn with(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.kind(), gateway);
        self
    }

    pub fn get(&self, kind: GatewayKind) -> Result<Arc<dyn PaymentGateway>, PaymentError> {
        self.gateways
            .get(&kind)
            .cloned()
            .ok_or(PaymentError::UnsupportedGateway(kind))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> PaymentRequest {
        PaymentRequest {
            transaction_id: "TXN-1".to_string(),
            amount: dec!(1882),
            currency: "BDT".to_string(),
            payer_name: "Rahim".to_string(),
            payer_email: "rahim@example.com".to_string(),
            payer_phone: None,
        }
    }

    fn hosted(server: &MockServer, timeout: Duration) -> HostedCheckoutGateway {
        HostedCheckoutGateway::new(
            HostedGatewayConfig {
                init_url: format!("{}/init", server.uri()),
                validation_url: format!("{}/validate", server.uri()),
                store_id: "store".to_string(),
                store_password: "secret".to_string(),
            },
            "https://shop.example.com/",
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_offline_gateway_is_pending_without_redirect() {
        let session = OfflineGateway::cash_on_delivery()
            .create_payment(&request())
            .await
            .unwrap();

        assert_eq!(session.status, PaymentInfoStatus::Pending);
        assert!(session.redirect_url.is_none());
    }

    #[tokio::test]
    async fn test_hosted_success_returns_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/init"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCESS",
                "GatewayPageURL": "https://pay.example.com/session/abc"
            })))
            .mount(&server)
            .await;

        let session = hosted(&server, Duration::from_secs(5))
            .create_payment(&request())
            .await
            .unwrap();

        assert_eq!(session.status, PaymentInfoStatus::Pending);
        assert_eq!(
            session.redirect_url.as_deref(),
            Some("https://pay.example.com/session/abc")
        );
    }

    #[tokio::test]
    async fn test_hosted_decline_is_failed_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "FAILED",
                "failedreason": "Store credential mismatch"
            })))
            .mount(&server)
            .await;

        let session = hosted(&server, Duration::from_secs(5))
            .create_payment(&request())
            .await
            .unwrap();

        assert_eq!(session.status, PaymentInfoStatus::Failed);
    }

    #[tokio::test]
    async fn test_hosted_malformed_response_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = hosted(&server, Duration::from_secs(5))
            .create_payment(&request())
            .await;

        assert!(matches!(result, Err(PaymentError::GatewayUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_hosted_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let result = hosted(&server, Duration::from_secs(5))
            .create_payment(&request())
            .await;

        assert!(matches!(result, Err(PaymentError::GatewayUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_hosted_timeout_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "SUCCESS", "GatewayPageURL": "https://x"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let result = hosted(&server, Duration::from_millis(50))
            .create_payment(&request())
            .await;

        assert!(matches!(result, Err(PaymentError::GatewayUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_hosted_validation_reports_transaction_and_amount() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/validate"))
            .and(query_param("val_id", "VAL-1"))
            .and(query_param("store_id", "store"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "VALID",
                "tran_id": "TXN-1",
                "amount": "1882.00"
            })))
            .mount(&server)
            .await;

        let validation = hosted(&server, Duration::from_secs(5))
            .validate("VAL-1")
            .await
            .unwrap();

        assert!(validation.valid);
        assert_eq!(validation.transaction_id, "TXN-1");
        assert_eq!(validation.amount, dec!(1882));
    }

    #[tokio::test]
    async fn test_hosted_validation_rejects_unknown_handle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "INVALID_TRANSACTION"
            })))
            .mount(&server)
            .await;

        let validation = hosted(&server, Duration::from_secs(5))
            .validate("forged")
            .await
            .unwrap();

        assert!(!validation.valid);
    }

    #[tokio::test]
    async fn test_offline_gateway_has_nothing_to_validate() {
        let result = OfflineGateway::bank_transfer().validate("VAL-1").await;

        assert!(matches!(
            result,
            Err(PaymentError::CallbackNotAccepted(GatewayKind::BankTransfer))
        ));
    }

    #[test]
    fn test_registry_rejects_unregistered_gateway() {
        let registry = GatewayRegistry::offline();

        assert!(registry.get(GatewayKind::CashOnDelivery).is_ok());
        assert!(matches!(
            registry.get(GatewayKind::Hosted),
            Err(PaymentError::UnsupportedGateway(GatewayKind::Hosted))
        ));
    }
}
