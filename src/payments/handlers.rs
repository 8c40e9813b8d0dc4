// HTTP handlers for payment endpoints

use axum::{
    extract::{Path, Query, State},
    response::Html,
    Form, Json,
};
use validator::Validate;

use crate::auth::{AdminUser, MaybeUser};
use crate::error::ApiError;
use crate::payments::{
    CallbackParams, ConfirmPaymentRequest, InitPaymentRequest, InitPaymentResponse, PaymentError,
    PaymentInfo, PaymentInfoStatus, PaymentOutcome,
};
use crate::AppState;

/// Handler for POST /api/payment/init
/// Starts a payment attempt with the chosen gateway
#[utoipa::path(
    post,
    path = "/api/payment/init",
    request_body = InitPaymentRequest,
    responses(
        (status = 200, description = "Payment attempt created", body = InitPaymentResponse),
        (status = 400, description = "Invalid amount or unconfigured gateway"),
        (status = 503, description = "Gateway unreachable; the attempt stays pending")
    ),
    tag = "payments"
)]
pub async fn init_payment_handler(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(request): Json<InitPaymentRequest>,
) -> Result<Json<InitPaymentResponse>, ApiError> {
    request.validate()?;

    let response = state
        .payment_service
        .init(user.map(|u| u.user_id), request)
        .await?;

    Ok(Json(response))
}

/// Handler for GET /api/payment/{transaction_id}
#[utoipa::path(
    get,
    path = "/api/payment/{transaction_id}",
    params(("transaction_id" = String, Path, description = "Payment correlation id")),
    responses(
        (status = 200, description = "Payment record", body = PaymentInfo),
        (status = 403, description = "Payment belongs to another user"),
        (status = 404, description = "Unknown transaction id")
    ),
    tag = "payments"
)]
pub async fn get_payment_handler(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(transaction_id): Path<String>,
) -> Result<Json<PaymentInfo>, PaymentError> {
    let payment = state
        .payment_service
        .find_for(&transaction_id, user.map(|u| u.user_id))
        .await?;

    Ok(Json(payment))
}

/// Handler for POST /api/payment/{transaction_id}/confirm
/// Settles a cash-on-delivery or bank-transfer payment (admin only)
#[utoipa::path(
    post,
    path = "/api/payment/{transaction_id}/confirm",
    params(("transaction_id" = String, Path, description = "Payment correlation id")),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment settled", body = PaymentInfo),
        (status = 400, description = "Hosted payment, pending target or already settled otherwise"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Unknown transaction id")
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn confirm_payment_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(transaction_id): Path<String>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<PaymentInfo>, PaymentError> {
    tracing::debug!(
        "Admin {} settling payment {} as {}",
        admin.user_id,
        transaction_id,
        request.status
    );

    let payment = state
        .payment_service
        .confirm_offline(&transaction_id, request.status)
        .await?;

    Ok(Json(payment))
}

/// Handler for GET|POST /api/payment/success
pub async fn payment_success_handler(
    State(state): State<AppState>,
    query: Option<Query<CallbackParams>>,
    form: Option<Form<CallbackParams>>,
) -> Result<Html<String>, PaymentError> {
    handle_callback(state, query, form, PaymentOutcome::Success).await
}

/// Handler for GET|POST /api/payment/fail
pub async fn payment_fail_handler(
    State(state): State<AppState>,
    query: Option<Query<CallbackParams>>,
    form: Option<Form<CallbackParams>>,
) -> Result<Html<String>, PaymentError> {
    handle_callback(state, query, form, PaymentOutcome::Failure).await
}

/// Handler for GET|POST /api/payment/cancel
pub async fn payment_cancel_handler(
    State(state): State<AppState>,
    query: Option<Query<CallbackParams>>,
    form: Option<Form<CallbackParams>>,
) -> Result<Html<String>, PaymentError> {
    handle_callback(state, query, form, PaymentOutcome::Cancelled).await
}

async fn handle_callback(
    state: AppState,
    query: Option<Query<CallbackParams>>,
    form: Option<Form<CallbackParams>>,
    outcome: PaymentOutcome,
) -> Result<Html<String>, PaymentError> {
    let params = form
        .map(|Form(params)| params)
        .or_else(|| query.map(|Query(params)| params))
        .ok_or(PaymentError::MissingTransactionId)?;

    let payment = state.payment_service.on_callback(&params, outcome).await?;

    Ok(Html(confirmation_page(&payment)))
}

/// User-facing page shown after the gateway redirects back
///
/// Only values from the stored record are rendered.
fn confirmation_page(payment: &PaymentInfo) -> String {
    let (title, message) = match payment.status {
        PaymentInfoStatus::Complete => ("Payment successful", "Thank you, your payment was received."),
        PaymentInfoStatus::Failed => ("Payment failed", "Your payment could not be completed."),
        PaymentInfoStatus::Cancelled => ("Payment cancelled", "Your payment was cancelled."),
        PaymentInfoStatus::Pending => ("Payment pending", "Your payment is being processed."),
    };

    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{message}</p>\
         <p>Transaction: {id}</p><p>Amount: {amount}</p></body></html>",
        title = title,
        message = message,
        id = payment.transaction_id,
        amount = payment.amount,
    )
}
