use std::str::FromStr;
use std::sync::Arc;

use common::error::WalletError;
use common::ids::UserId;
use rust_decimal::Decimal;
use tonic::{Request, Response, Status};

use crate::api::error::to_tonic_status;
use crate::api::proto::wallet as proto;
use crate::use_cases::connect_account_stripe::ConnectAccountStripeUseCase;
use crate::use_cases::convert::ConvertUseCase;
use crate::use_cases::create_payment_transaction::CreatePaymentTransactionUseCase;
use crate::use_cases::create_wallet::CreateWalletUseCase;
use crate::use_cases::create_withdraw_transaction::CreateWithdrawTransactionUseCase;
use crate::use_cases::get_balance::GetBalanceUseCase;
use crate::use_cases::handle_stripe_payment::HandleStripePaymentUseCase;
use crate::use_cases::handle_stripe_payout::HandleStripePayoutUseCase;
use crate::use_cases::transfer::TransferUseCase;

fn parse_decimal(raw: &str) -> Result<Decimal, WalletError> {
    Decimal::from_str(raw).map_err(|e| WalletError::InvalidData(format!("invalid amount {raw}: {e}")))
}

fn parse_currency(raw: &str) -> Result<common::enums::CurrencyCode, WalletError> {
    raw.parse().map_err(WalletError::InvalidData)
}

fn parse_provider(raw: &str) -> Result<common::enums::Provider, WalletError> {
    raw.parse().map_err(WalletError::InvalidData)
}

/// Wires the nine orchestrator RPCs (§4.6, §6) onto the generated `Wallet`
/// trait. Every handler does argument parsing + use-case dispatch + error
/// mapping, nothing else.
pub struct WalletGrpcService {
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

#[tonic::async_trait]
impl proto::wallet_server::Wallet for WalletGrpcService {
    async fn create_wallet(
        &self,
        request: Request<proto::CreateWalletRequest>,
    ) -> Result<Response<proto::CreateWalletResponse>, Status> {
        let req = request.into_inner();
        let output = self
            .create_wallet
            .execute(UserId(req.user_id))
            .await
            .map_err(to_tonic_status)?;

        Ok(Response::new(proto::CreateWalletResponse {
            wallet_id: output.wallet_id.0,
            created_at: output.created_at.to_rfc3339(),
        }))
    }

    async fn get_balance(
        &self,
        request: Request<proto::GetBalanceRequest>,
    ) -> Result<Response<proto::GetBalanceResponse>, Status> {
        let req = request.into_inner();
        let currency = req
            .currency
            .map(|c| parse_currency(&c))
            .transpose()
            .map_err(to_tonic_status)?;

        let output = self
            .get_balance
            .execute(UserId(req.user_id), currency)
            .await
            .map_err(to_tonic_status)?;

        Ok(Response::new(proto::GetBalanceResponse {
            user_id: output.user_id.0,
            wallet_id: output.wallet_id.0,
            balances: output
                .balances
                .into_iter()
                .map(|b| proto::Balance {
                    currency: b.currency.as_str().to_string(),
                    amount: b.amount.to_string(),
                })
                .collect(),
        }))
    }

    async fn transfer(
        &self,
        request: Request<proto::TransferRequest>,
    ) -> Result<Response<proto::TransferResponse>, Status> {
        let req = request.into_inner();
        let amount = parse_decimal(&req.amount).map_err(to_tonic_status)?;
        let currency = parse_currency(&req.currency).map_err(to_tonic_status)?;

        let output = self
            .transfer
            .execute(UserId(req.from_user), UserId(req.to_user), amount, currency, req.idempotency_key)
            .await
            .map_err(to_tonic_status)?;

        Ok(Response::new(proto::TransferResponse {
            correlation_id: output.correlation_id.to_string(),
            status: format!("{:?}", output.status).to_lowercase(),
        }))
    }

    async fn convert(
        &self,
        request: Request<proto::ConvertRequest>,
    ) -> Result<Response<proto::ConvertResponse>, Status> {
        let req = request.into_inner();
        let amount = parse_decimal(&req.amount).map_err(to_tonic_status)?;
        let from_currency = parse_currency(&req.from_currency).map_err(to_tonic_status)?;
        let to_currency = parse_currency(&req.to_currency).map_err(to_tonic_status)?;

        let output = self
            .convert
            .execute(UserId(req.user_id), amount, from_currency, to_currency, req.idempotency_key)
            .await
            .map_err(to_tonic_status)?;

        Ok(Response::new(proto::ConvertResponse {
            correlation_id: output.correlation_id.to_string(),
            status: format!("{:?}", output.status).to_lowercase(),
        }))
    }

    async fn create_payment_transaction(
        &self,
        request: Request<proto::CreatePaymentTransactionRequest>,
    ) -> Result<Response<proto::CreatePaymentTransactionResponse>, Status> {
        let req = request.into_inner();
        let amount = parse_decimal(&req.amount).map_err(to_tonic_status)?;
        let currency = parse_currency(&req.currency).map_err(to_tonic_status)?;
        let gateway = parse_provider(&req.gateway).map_err(to_tonic_status)?;

        let output = self
            .create_payment_transaction
            .execute(UserId(req.user_id), amount, currency, gateway, req.idempotency_key)
            .await
            .map_err(to_tonic_status)?;

        Ok(Response::new(proto::CreatePaymentTransactionResponse {
            redirect_url: output.redirect_url,
        }))
    }

    async fn connect_account_stripe(
        &self,
        request: Request<proto::ConnectAccountStripeRequest>,
    ) -> Result<Response<proto::ConnectAccountStripeResponse>, Status> {
        let req = request.into_inner();
        let output = self
            .connect_account_stripe
            .execute(UserId(req.user_id))
            .await
            .map_err(to_tonic_status)?;

        Ok(Response::new(proto::ConnectAccountStripeResponse {
            redirect_url: output.redirect_url,
        }))
    }

    async fn handle_stripe_payment(
        &self,
        request: Request<proto::ProviderWebhookRequest>,
    ) -> Result<Response<proto::ProviderWebhookResponse>, Status> {
        let req = request.into_inner();
        let event = self
            .stripe
            .verify_and_normalize_payment_webhook(&req.raw_body, &req.signature_header)
            .map_err(to_tonic_status)?;

        let output = self
            .handle_stripe_payment
            .execute(event)
            .await
            .map_err(to_tonic_status)?;

        Ok(Response::new(proto::ProviderWebhookResponse {
            success: output.success,
            message: output.message,
        }))
    }

    async fn handle_stripe_payout(
        &self,
        request: Request<proto::ProviderWebhookRequest>,
    ) -> Result<Response<proto::ProviderWebhookResponse>, Status> {
        let req = request.into_inner();
        let event = self
            .stripe
            .verify_and_normalize_payout_webhook(&req.raw_body, &req.signature_header)
            .map_err(to_tonic_status)?;

        let output = self
            .handle_stripe_payout
            .execute(event)
            .await
            .map_err(to_tonic_status)?;

        Ok(Response::new(proto::ProviderWebhookResponse {
            success: output.success,
            message: output.message,
        }))
    }

    async fn create_withdraw_transaction(
        &self,
        request: Request<proto::CreateWithdrawTransactionRequest>,
    ) -> Result<Response<proto::CreateWithdrawTransactionResponse>, Status> {
        let req = request.into_inner();
        let amount = parse_decimal(&req.amount).map_err(to_tonic_status)?;
        let currency = parse_currency(&req.currency).map_err(to_tonic_status)?;
        let gateway = parse_provider(&req.gateway).map_err(to_tonic_status)?;

        let output = self
            .create_withdraw_transaction
            .execute(UserId(req.user_id), amount, currency, gateway, req.idempotency_key)
            .await
            .map_err(to_tonic_status)?;

        Ok(Response::new(proto::CreateWithdrawTransactionResponse {
            correlation_id: output.correlation_id.to_string(),
            status: format!("{:?}", output.status).to_lowercase(),
        }))
    }
}
