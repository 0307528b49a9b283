use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use common::ids::UserId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::api::response::ApiResponse;
use crate::use_cases::connect_account_stripe::ConnectAccountStripeUseCase;
use crate::use_cases::convert::ConvertUseCase;
use crate::use_cases::create_payment_transaction::CreatePaymentTransactionUseCase;
use crate::use_cases::create_wallet::CreateWalletUseCase;
use crate::use_cases::create_withdraw_transaction::CreateWithdrawTransactionUseCase;
use crate::use_cases::get_balance::GetBalanceUseCase;
use crate::use_cases::handle_stripe_payment::HandleStripePaymentUseCase;
use crate::use_cases::handle_stripe_payout::HandleStripePayoutUseCase;
use crate::use_cases::transfer::TransferUseCase;

/// Collaborators shared by every handler. The HTTP mirror and the gRPC
/// service wrap the same use cases (§6) rather than duplicating logic.
#[derive(Clone)]
pub struct AppState {
    pub create_wallet: Arc<CreateWalletUseCase>,
    pub get_balance: Arc<GetBalanceUseCase>,
    pub transfer: Arc<TransferUseCase>,
    pub convert: Arc<ConvertUseCase>,
    pub create_payment_transaction: Arc<CreatePaymentTransactionUseCase>,
    pub connect_account_stripe: Arc<ConnectAccountStripeUseCase>,
    pub handle_stripe_payment: Arc<HandleStripePaymentUseCase>,
    pub handle_stripe_payout: Arc<HandleStripePayoutUseCase>,
    pub create_withdraw_transaction: Arc<CreateWithdrawTransactionUseCase>,
    pub stripe: Arc<dyn crate::domain::gateway::ProviderGateway>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/wallets", post(create_wallet))
        .route("/wallets/{user_id}/balance", get(get_balance))
        .route("/transfers", post(transfer))
        .route("/conversions", post(convert))
        .route("/payments", post(create_payment_transaction))
        .route("/withdrawals", post(create_withdraw_transaction))
        .route("/stripe/connect", post(connect_account_stripe))
        .route("/webhooks/stripe/payment", post(handle_stripe_payment))
        .route("/webhooks/stripe/payout", post(handle_stripe_payout))
        .with_state(state)
}

#[derive(Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    pub user_id: i64,
}

#[derive(Serialize, ToSchema)]
pub struct CreateWalletResponseBody {
    pub wallet_id: i64,
    pub created_at: String,
}

#[utoipa::path(post, path = "/wallets", request_body = CreateWalletRequest,
    responses((status = 200, body = ApiResponse<CreateWalletResponseBody>)))]
pub async fn create_wallet(
    State(state): State<AppState>,
    Json(body): Json<CreateWalletRequest>,
) -> Result<Json<ApiResponse<CreateWalletResponseBody>>, ApiError> {
    let output = state.create_wallet.execute(UserId(body.user_id)).await?;
    Ok(Json(ApiResponse::success(CreateWalletResponseBody {
        wallet_id: output.wallet_id.0,
        created_at: output.created_at.to_rfc3339(),
    })))
}

#[derive(Deserialize)]
pub struct BalanceQuery {
    pub currency: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct BalanceBody {
    pub currency: String,
    pub amount: String,
}

#[derive(Serialize, ToSchema)]
pub struct GetBalanceResponseBody {
    pub user_id: i64,
    pub wallet_id: i64,
    pub balances: Vec<BalanceBody>,
}

#[utoipa::path(get, path = "/wallets/{user_id}/balance",
    responses((status = 200, body = ApiResponse<GetBalanceResponseBody>)))]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<ApiResponse<GetBalanceResponseBody>>, ApiError> {
    let currency = query
        .currency
        .map(|c| common::enums::CurrencyCode::from_str(&c))
        .transpose()
        .map_err(common::error::WalletError::InvalidData)?;

    let output = state.get_balance.execute(UserId(user_id), currency).await?;
    Ok(Json(ApiResponse::success(GetBalanceResponseBody {
        user_id: output.user_id.0,
        wallet_id: output.wallet_id.0,
        balances: output
            .balances
            .into_iter()
            .map(|b| BalanceBody {
                currency: b.currency.as_str().to_string(),
                amount: b.amount.to_string(),
            })
            .collect(),
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct TransferRequest {
    pub from_user: i64,
    pub to_user: i64,
    pub amount: String,
    pub currency: String,
    pub idempotency_key: String,
}

#[derive(Serialize, ToSchema)]
pub struct TransactionRef {
    pub correlation_id: String,
    pub status: String,
}

#[utoipa::path(post, path = "/transfers", request_body = TransferRequest,
    responses((status = 200, body = ApiResponse<TransactionRef>)))]
pub async fn transfer(
    State(state): State<AppState>,
    Json(body): Json<TransferRequest>,
) -> Result<Json<ApiResponse<TransactionRef>>, ApiError> {
    let currency = parse_currency(&body.currency)?;
    let amount = parse_amount(&body.amount)?;
    let output = state
        .transfer
        .execute(UserId(body.from_user), UserId(body.to_user), amount, currency, body.idempotency_key)
        .await?;
    Ok(Json(ApiResponse::success(TransactionRef {
        correlation_id: output.correlation_id.to_string(),
        status: format!("{:?}", output.status).to_lowercase(),
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct ConvertRequest {
    pub user_id: i64,
    pub amount: String,
    pub from_currency: String,
    pub to_currency: String,
    pub idempotency_key: String,
}

#[utoipa::path(post, path = "/conversions", request_body = ConvertRequest,
    responses((status = 200, body = ApiResponse<TransactionRef>)))]
pub async fn convert(
    State(state): State<AppState>,
    Json(body): Json<ConvertRequest>,
) -> Result<Json<ApiResponse<TransactionRef>>, ApiError> {
    let from_currency = parse_currency(&body.from_currency)?;
    let to_currency = parse_currency(&body.to_currency)?;
    let amount = parse_amount(&body.amount)?;
    let output = state
        .convert
        .execute(UserId(body.user_id), amount, from_currency, to_currency, body.idempotency_key)
        .await?;
    Ok(Json(ApiResponse::success(TransactionRef {
        correlation_id: output.correlation_id.to_string(),
        status: format!("{:?}", output.status).to_lowercase(),
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePaymentTransactionRequest {
    pub user_id: i64,
    pub amount: String,
    pub currency: String,
    pub gateway: String,
    pub idempotency_key: String,
}

#[derive(Serialize, ToSchema)]
pub struct RedirectBody {
    pub redirect_url: String,
}

#[utoipa::path(post, path = "/payments", request_body = CreatePaymentTransactionRequest,
    responses((status = 200, body = ApiResponse<RedirectBody>)))]
pub async fn create_payment_transaction(
    State(state): State<AppState>,
    Json(body): Json<CreatePaymentTransactionRequest>,
) -> Result<Json<ApiResponse<RedirectBody>>, ApiError> {
    let currency = parse_currency(&body.currency)?;
    let gateway = parse_provider(&body.gateway)?;
    let amount = parse_amount(&body.amount)?;
    let output = state
        .create_payment_transaction
        .execute(UserId(body.user_id), amount, currency, gateway, body.idempotency_key)
        .await?;
    Ok(Json(ApiResponse::success(RedirectBody {
        redirect_url: output.redirect_url,
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateWithdrawTransactionRequest {
    pub user_id: i64,
    pub amount: String,
    pub currency: String,
    pub gateway: String,
    pub idempotency_key: String,
}

#[utoipa::path(post, path = "/withdrawals", request_body = CreateWithdrawTransactionRequest,
    responses((status = 200, body = ApiResponse<TransactionRef>)))]
pub async fn create_withdraw_transaction(
    State(state): State<AppState>,
    Json(body): Json<CreateWithdrawTransactionRequest>,
) -> Result<Json<ApiResponse<TransactionRef>>, ApiError> {
    let currency = parse_currency(&body.currency)?;
    let gateway = parse_provider(&body.gateway)?;
    let amount = parse_amount(&body.amount)?;
    let output = state
        .create_withdraw_transaction
        .execute(UserId(body.user_id), amount, currency, gateway, body.idempotency_key)
        .await?;
    Ok(Json(ApiResponse::success(TransactionRef {
        correlation_id: output.correlation_id.to_string(),
        status: format!("{:?}", output.status).to_lowercase(),
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct ConnectAccountStripeRequest {
    pub user_id: i64,
}

#[utoipa::path(post, path = "/stripe/connect", request_body = ConnectAccountStripeRequest,
    responses((status = 200, body = ApiResponse<RedirectBody>)))]
pub async fn connect_account_stripe(
    State(state): State<AppState>,
    Json(body): Json<ConnectAccountStripeRequest>,
) -> Result<Json<ApiResponse<RedirectBody>>, ApiError> {
    let output = state.connect_account_stripe.execute(UserId(body.user_id)).await?;
    Ok(Json(ApiResponse::success(RedirectBody {
        redirect_url: output.redirect_url,
    })))
}

#[derive(Serialize, ToSchema)]
pub struct WebhookResponseBody {
    pub success: bool,
    pub message: String,
}

/// Raw body + `Stripe-Signature` header; the gateway verifies authenticity
/// before any handler logic runs (§4.4).
#[utoipa::path(post, path = "/webhooks/stripe/payment",
    responses((status = 200, body = ApiResponse<WebhookResponseBody>)))]
pub async fn handle_stripe_payment(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<ApiResponse<WebhookResponseBody>>, ApiError> {
    let signature = signature_header(&headers)?;
    let event = state
        .stripe
        .verify_and_normalize_payment_webhook(&body, signature)
        .map_err(ApiError::from)?;
    let output = state.handle_stripe_payment.execute(event).await?;
    Ok(Json(ApiResponse::success(WebhookResponseBody {
        success: output.success,
        message: output.message,
    })))
}

#[utoipa::path(post, path = "/webhooks/stripe/payout",
    responses((status = 200, body = ApiResponse<WebhookResponseBody>)))]
pub async fn handle_stripe_payout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<ApiResponse<WebhookResponseBody>>, ApiError> {
    let signature = signature_header(&headers)?;
    let event = state
        .stripe
        .verify_and_normalize_payout_webhook(&body, signature)
        .map_err(ApiError::from)?;
    let output = state.handle_stripe_payout.execute(event).await?;
    Ok(Json(ApiResponse::success(WebhookResponseBody {
        success: output.success,
        message: output.message,
    })))
}

fn signature_header(headers: &axum::http::HeaderMap) -> Result<&str, ApiError> {
    headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::from(common::error::WalletError::InvalidData(
                "missing Stripe-Signature header".to_string(),
            ))
        })
}

fn parse_amount(raw: &str) -> Result<rust_decimal::Decimal, ApiError> {
    rust_decimal::Decimal::from_str(raw)
        .map_err(|e| common::error::WalletError::InvalidData(format!("invalid amount {raw}: {e}")))
        .map_err(ApiError::from)
}

fn parse_currency(raw: &str) -> Result<common::enums::CurrencyCode, ApiError> {
    raw.parse()
        .map_err(common::error::WalletError::InvalidData)
        .map_err(ApiError::from)
}

fn parse_provider(raw: &str) -> Result<common::enums::Provider, ApiError> {
    raw.parse()
        .map_err(common::error::WalletError::InvalidData)
        .map_err(ApiError::from)
}
