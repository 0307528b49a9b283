use std::sync::Arc;

use async_trait::async_trait;
use common::entities::ProviderLinkedAccount;
use common::enums::Provider;
use common::error::WalletError;
use common::ids::{TransactionId, UserId, WalletId};
use common::messages::NormalizedProviderEvent;
use rust_decimal::Decimal;

pub struct CheckoutSession {
    pub redirect_url: String,
    pub external_id: String,
}

pub struct OnboardingLink {
    pub redirect_url: String,
}

pub struct PayoutResult {
    pub transfer_id: String,
    pub payout_id: String,
    pub status: String,
}

/// §4.4: polymorphic over one capability set, one implementation per
/// `Provider` variant. Never dispatched by string.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        wallet_id: WalletId,
        transaction_id: TransactionId,
        amount: Decimal,
        currency: common::enums::CurrencyCode,
    ) -> Result<CheckoutSession, WalletError>;

    async fn create_connected_account(&self, user_id: UserId) -> Result<String, WalletError>;

    async fn onboarding_link(&self, external_account_id: &str) -> Result<OnboardingLink, WalletError>;

    /// Fails with `NoProviderAccount` if the linked account isn't ready to
    /// receive payouts (e.g. Stripe `requirements.disabled_reason` is set).
    async fn verify_account_ready(
        &self,
        account: &ProviderLinkedAccount,
    ) -> Result<(), WalletError>;

    async fn payout(
        &self,
        account: &ProviderLinkedAccount,
        amount: Decimal,
        currency: common::enums::CurrencyCode,
    ) -> Result<PayoutResult, WalletError>;

    /// Verifies the webhook signature against the provider-specific secret
    /// and, only if it checks out, normalizes the payload. Side effects
    /// downstream of this call MUST NOT run on a payload that failed here.
    fn verify_and_normalize_payment_webhook(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<NormalizedProviderEvent, WalletError>;

    fn verify_and_normalize_payout_webhook(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<NormalizedProviderEvent, WalletError>;
}

/// Resolves a `Provider` tag to its gateway implementation. Dispatch stays
/// compile-time exhaustive on the enum; no string-keyed registry.
#[derive(Clone)]
pub struct ProviderGateways {
    pub stripe: Arc<dyn ProviderGateway>,
    pub cloudpayments: Arc<dyn ProviderGateway>,
}

impl ProviderGateways {
    pub fn get(&self, provider: Provider) -> &Arc<dyn ProviderGateway> {
        match provider {
            Provider::Stripe => &self.stripe,
            Provider::Cloudpayments => &self.cloudpayments,
        }
    }
}
