use async_trait::async_trait;
use common::entities::ProviderLinkedAccount;
use common::enums::CurrencyCode;
use common::error::WalletError;
use common::ids::{TransactionId, UserId, WalletId};
use common::messages::NormalizedProviderEvent;
use common::money::{from_minor_units, to_minor_units};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;

use crate::domain::gateway::{CheckoutSession, OnboardingLink, PayoutResult, ProviderGateway};

type HmacSha256 = Hmac<Sha256>;

/// Talks to the Stripe REST API directly over `reqwest`, the way this
/// capability set is modeled over HTTP elsewhere in this ecosystem. No
/// Stripe SDK dependency: the surface area used here (Checkout Sessions,
/// Connected Accounts, Account Links, Transfers, Payouts) is a handful of
/// well-documented REST calls.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
    payment_webhook_secret: String,
    payout_webhook_secret: String,
}

impl StripeGateway {
    pub fn new(
        secret_key: String,
        base_url: String,
        payment_webhook_secret: String,
        payout_webhook_secret: String,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("reqwest client builds with static config"),
            secret_key,
            base_url,
            payment_webhook_secret,
            payout_webhook_secret,
        }
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<serde_json::Value, WalletError> {
        let response = self
            .client
            .post(format!("https://api.stripe.com/v1/{path}"))
            .basic_auth(&self.secret_key, Some(""))
            .form(form)
            .send()
            .await
            .map_err(|e| WalletError::ProviderError(format!("stripe request failed: {e}")))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalletError::ProviderError(format!(
                "stripe returned an error: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| WalletError::ProviderError(format!("invalid stripe response: {e}")))
    }

    fn verify_signature(raw_body: &[u8], signature_header: &str, secret: &str) -> Result<(), WalletError> {
        let mut timestamp = None;
        let mut signature = None;
        for part in signature_header.split(',') {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(v1) = part.strip_prefix("v1=") {
                signature = Some(v1);
            }
        }
        let (timestamp, signature) = match (timestamp, signature) {
            (Some(t), Some(v)) => (t, v),
            _ => return Err(WalletError::ProviderError("malformed signature header".into())),
        };

        let signed_payload = [timestamp.as_bytes(), b".", raw_body].concat();
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| WalletError::ProviderError(format!("bad webhook secret: {e}")))?;
        mac.update(&signed_payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        if expected != signature {
            return Err(WalletError::ProviderError(
                "webhook signature verification failed".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct StripeEvent {
    livemode: bool,
    data: StripeEventData,
}

#[derive(Deserialize)]
struct StripeEventData {
    object: StripeEventObject,
}

#[derive(Deserialize)]
struct StripeEventObject {
    id: String,
    amount: i64,
    currency: String,
    status: Option<String>,
    metadata: StripeMetadata,
}

#[derive(Deserialize)]
struct StripeMetadata {
    wallet_id: i64,
    transaction_id: i64,
    idempotency_key: String,
}

fn normalize(event: StripeEvent) -> Result<NormalizedProviderEvent, WalletError> {
    let object = event.data.object;
    let currency: CurrencyCode = object
        .currency
        .parse()
        .map_err(WalletError::ProviderError)?;

    Ok(NormalizedProviderEvent {
        idempotency_key: object.metadata.idempotency_key,
        external_payment_id: object.id,
        amount: from_minor_units(object.amount),
        currency,
        status: object.status.unwrap_or_else(|| "succeeded".to_string()),
        livemode: event.livemode,
        transaction_id: TransactionId(object.metadata.transaction_id),
        wallet_id: WalletId(object.metadata.wallet_id),
    })
}

#[async_trait]
impl ProviderGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        wallet_id: WalletId,
        transaction_id: TransactionId,
        amount: Decimal,
        currency: CurrencyCode,
    ) -> Result<CheckoutSession, WalletError> {
        let unit_amount = to_minor_units(amount).to_string();
        let metadata_wallet = wallet_id.0.to_string();
        let metadata_tx = transaction_id.0.to_string();

        let response = self
            .post_form(
                "checkout/sessions",
                &[
                    ("mode", "payment".to_string()),
                    ("line_items[0][price_data][currency]", currency.as_str().to_lowercase()),
                    ("line_items[0][price_data][unit_amount]", unit_amount),
                    ("line_items[0][quantity]", "1".to_string()),
                    ("metadata[wallet_id]", metadata_wallet.clone()),
                    ("metadata[transaction_id]", metadata_tx.clone()),
                    ("payment_intent_data[metadata][wallet_id]", metadata_wallet),
                    ("payment_intent_data[metadata][transaction_id]", metadata_tx),
                    ("success_url", format!("{}/checkout/success", self.base_url)),
                    ("cancel_url", format!("{}/checkout/cancel", self.base_url)),
                ],
            )
            .await?;

        Ok(CheckoutSession {
            redirect_url: response["url"].as_str().unwrap_or_default().to_string(),
            external_id: response["id"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn create_connected_account(&self, _user_id: UserId) -> Result<String, WalletError> {
        let response = self
            .post_form(
                "accounts",
                &[
                    ("type", "express".to_string()),
                    ("capabilities[transfers][requested]", "true".to_string()),
                    ("settings[payouts][schedule][interval]", "manual".to_string()),
                ],
            )
            .await?;

        Ok(response["id"].as_str().unwrap_or_default().to_string())
    }

    async fn onboarding_link(&self, external_account_id: &str) -> Result<OnboardingLink, WalletError> {
        let response = self
            .post_form(
                "account_links",
                &[
                    ("account", external_account_id.to_string()),
                    ("type", "account_onboarding".to_string()),
                    ("refresh_url", format!("{}/stripe/onboarding/refresh", self.base_url)),
                    ("return_url", format!("{}/stripe/onboarding/return", self.base_url)),
                ],
            )
            .await?;

        Ok(OnboardingLink {
            redirect_url: response["url"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn verify_account_ready(&self, account: &ProviderLinkedAccount) -> Result<(), WalletError> {
        let response = self
            .client
            .get(format!(
                "https://api.stripe.com/v1/accounts/{}",
                account.external_account_id()
            ))
            .basic_auth(&self.secret_key, Some(""))
            .send()
            .await
            .map_err(|e| WalletError::ProviderError(format!("stripe request failed: {e}")))?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| WalletError::ProviderError(format!("invalid stripe response: {e}")))?;

        let disabled_reason = response
            .get("requirements")
            .and_then(|r| r.get("disabled_reason"))
            .and_then(|v| v.as_str());

        if disabled_reason.is_some() {
            return Err(WalletError::NoProviderAccount(account.user_id()));
        }
        Ok(())
    }

    async fn payout(
        &self,
        account: &ProviderLinkedAccount,
        amount: Decimal,
        currency: CurrencyCode,
    ) -> Result<PayoutResult, WalletError> {
        let minor = to_minor_units(amount).to_string();
        let currency_code = currency.as_str().to_lowercase();

        let transfer = self
            .post_form(
                "transfers",
                &[
                    ("amount", minor.clone()),
                    ("currency", currency_code.clone()),
                    ("destination", account.external_account_id().to_string()),
                ],
            )
            .await?;
        let transfer_id = transfer["id"].as_str().unwrap_or_default().to_string();

        let payout = self
            .post_form(
                "payouts",
                &[("amount", minor), ("currency", currency_code)],
            )
            .await?;

        Ok(PayoutResult {
            transfer_id,
            payout_id: payout["id"].as_str().unwrap_or_default().to_string(),
            status: payout["status"].as_str().unwrap_or_default().to_string(),
        })
    }

    fn verify_and_normalize_payment_webhook(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<NormalizedProviderEvent, WalletError> {
        Self::verify_signature(raw_body, signature_header, &self.payment_webhook_secret)?;
        let event: StripeEvent = serde_json::from_slice(raw_body)
            .map_err(|e| WalletError::ProviderError(format!("malformed webhook payload: {e}")))?;
        normalize(event)
    }

    fn verify_and_normalize_payout_webhook(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<NormalizedProviderEvent, WalletError> {
        Self::verify_signature(raw_body, signature_header, &self.payout_webhook_secret)?;
        let event: StripeEvent = serde_json::from_slice(raw_body)
            .map_err(|e| WalletError::ProviderError(format!("malformed webhook payload: {e}")))?;
        normalize(event)
    }
}
