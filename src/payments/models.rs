use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Status of a payment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentInfoStatus {
    Pending,
    Complete,
    Failed,
    Cancelled,
}

impl PaymentInfoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentInfoStatus::Pending => "pending",
            PaymentInfoStatus::Complete => "complete",
            PaymentInfoStatus::Failed => "failed",
            PaymentInfoStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentInfoStatus::Pending)
    }
}

impl std::fmt::Display for PaymentInfoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment gateway key; doubles as the order's payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// Paid to the courier; confirmed by an admin
    CashOnDelivery,
    /// Manual transfer; confirmed by an admin
    BankTransfer,
    /// Redirect-based hosted checkout page
    Hosted,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::CashOnDelivery => "cash_on_delivery",
            GatewayKind::BankTransfer => "bank_transfer",
            GatewayKind::Hosted => "hosted",
        }
    }

    /// True when the provider reports the outcome on the callback URLs;
    /// offline payments are settled by an admin instead
    pub fn settles_by_callback(&self) -> bool {
        matches!(self, GatewayKind::Hosted)
    }
}

impl std::fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local record of a payment attempt
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PaymentInfo {
    pub id: Uuid,
    pub transaction_id: String,
    pub user_id: Option<i32>,
    pub gateway: GatewayKind,
    pub amount: Decimal,
    pub status: PaymentInfoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome reported by a gateway callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    Failure,
    Cancelled,
}

impl From<PaymentOutcome> for PaymentInfoStatus {
    fn from(outcome: PaymentOutcome) -> Self {
        match outcome {
            PaymentOutcome::Success => PaymentInfoStatus::Complete,
            PaymentOutcome::Failure => PaymentInfoStatus::Failed,
            PaymentOutcome::Cancelled => PaymentInfoStatus::Cancelled,
        }
    }
}

/// What a gateway needs to start a payment
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub transaction_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub payer_name: String,
    pub payer_email: String,
    pub payer_phone: Option<String>,
}

/// What a gateway returns when a payment is started
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySession {
    pub status: PaymentInfoStatus,
    pub redirect_url: Option<String>,
}

/// What the provider reports when asked to validate a success callback
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayValidation {
    pub transaction_id: String,
    pub amount: Decimal,
    pub valid: bool,
}

/// Request DTO for POST /api/payment/init
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct InitPaymentRequest {
    pub gateway: GatewayKind,
    pub amount: Decimal,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub user_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub user_email: String,
    pub user_phone: Option<String>,
}

/// Response DTO for POST /api/payment/init
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InitPaymentResponse {
    pub transaction_id: String,
    pub gateway: GatewayKind,
    pub status: PaymentInfoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

/// Fields posted (or appended as a query string) by gateway callbacks
///
/// `val_id` is the provider's validation handle; success callbacks without
/// one are never trusted.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    pub tran_id: String,
    #[serde(default)]
    pub val_id: Option<String>,
}

/// Request DTO for POST /api/payment/{transaction_id}/confirm
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    /// complete, failed or cancelled
    pub status: PaymentInfoStatus,
}
