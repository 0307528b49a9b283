use async_trait::async_trait;
use common::entities::ProviderLinkedAccount;
use common::enums::CurrencyCode;
use common::error::WalletError;
use common::ids::{TransactionId, UserId, WalletId};
use common::messages::NormalizedProviderEvent;
use rust_decimal::Decimal;

use crate::domain::gateway::{CheckoutSession, OnboardingLink, PayoutResult, ProviderGateway};

/// Cloudpayments settles in RUB but this deployment has no merchant
/// agreement wired up yet. Kept as a real `ProviderGateway` implementation
/// so `Provider::Cloudpayments` stays selectable and routes to a clean
/// `Unsupported` error instead of panicking on an unmatched enum arm.
pub struct CloudpaymentsGateway;

fn unsupported(op: &str) -> WalletError {
    WalletError::Unsupported(format!("cloudpayments: {op} is not implemented"))
}

#[async_trait]
impl ProviderGateway for CloudpaymentsGateway {
    async fn create_checkout_session(
        &self,
        _wallet_id: WalletId,
        _transaction_id: TransactionId,
        _amount: Decimal,
        _currency: CurrencyCode,
    ) -> Result<CheckoutSession, WalletError> {
        Err(unsupported("create_checkout_session"))
    }

    async fn create_connected_account(&self, _user_id: UserId) -> Result<String, WalletError> {
        Err(unsupported("create_connected_account"))
    }

    async fn onboarding_link(&self, _external_account_id: &str) -> Result<OnboardingLink, WalletError> {
        Err(unsupported("onboarding_link"))
    }

    async fn verify_account_ready(&self, _account: &ProviderLinkedAccount) -> Result<(), WalletError> {
        Err(unsupported("verify_account_ready"))
    }

    async fn payout(
        &self,
        _account: &ProviderLinkedAccount,
        _amount: Decimal,
        _currency: CurrencyCode,
    ) -> Result<PayoutResult, WalletError> {
        Err(unsupported("payout"))
    }

    fn verify_and_normalize_payment_webhook(
        &self,
        _raw_body: &[u8],
        _signature_header: &str,
    ) -> Result<NormalizedProviderEvent, WalletError> {
        Err(unsupported("verify_and_normalize_payment_webhook"))
    }

    fn verify_and_normalize_payout_webhook(
        &self,
        _raw_body: &[u8],
        _signature_header: &str,
    ) -> Result<NormalizedProviderEvent, WalletError> {
        Err(unsupported("verify_and_normalize_payout_webhook"))
    }
}
