use std::sync::Arc;

use common::enums::Provider;
use common::error::WalletError;
use common::ids::UserId;
use sqlx::PgPool;

use crate::domain::gateway::ProviderGateway;
use crate::domain::repository::ProviderLinkedAccountRepository;

pub struct ConnectAccountStripeOutput {
    pub redirect_url: String,
}

pub struct ConnectAccountStripeUseCase {
    pool: PgPool,
    linked_accounts: Arc<dyn ProviderLinkedAccountRepository>,
    stripe: Arc<dyn ProviderGateway>,
}

impl ConnectAccountStripeUseCase {
    pub fn new(
        pool: PgPool,
        linked_accounts: Arc<dyn ProviderLinkedAccountRepository>,
        stripe: Arc<dyn ProviderGateway>,
    ) -> Self {
        Self {
            pool,
            linked_accounts,
            stripe,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, user_id: UserId) -> Result<ConnectAccountStripeOutput, WalletError> {
        let mut tx = self.pool.begin().await?;

        let account = match self
            .linked_accounts
            .find_by_user(&mut tx, user_id, Provider::Stripe)
            .await?
        {
            Some(existing) => existing,
            None => {
                let external_account_id = self.stripe.create_connected_account(user_id).await?;
                self.linked_accounts
                    .create(&mut tx, user_id, Provider::Stripe, external_account_id)
                    .await?
            }
        };

        tx.commit().await?;

        let link = self.stripe.onboarding_link(account.external_account_id()).await?;

        Ok(ConnectAccountStripeOutput {
            redirect_url: link.redirect_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::{MockProviderGateway, OnboardingLink};
    use crate::infrastructure::persistence::provider_linked_account_repository::PostgresProviderLinkedAccountRepository;

    #[sqlx::test]
    async fn first_call_creates_the_linked_account_then_onboards_it(pool: PgPool) {
        let mut stripe = MockProviderGateway::new();
        stripe
            .expect_create_connected_account()
            .times(1)
            .returning(|_| Ok("acct_123".into()));
        stripe
            .expect_onboarding_link()
            .withf(|id| id == "acct_123")
            .returning(|_| {
                Ok(OnboardingLink {
                    redirect_url: "https://connect.stripe.com/onboard".into(),
                })
            });

        let use_case = ConnectAccountStripeUseCase::new(
            pool,
            Arc::new(PostgresProviderLinkedAccountRepository::new()),
            Arc::new(stripe),
        );

        let output = use_case.execute(UserId(1)).await.unwrap();
        assert_eq!(output.redirect_url, "https://connect.stripe.com/onboard");
    }

    #[sqlx::test]
    async fn second_call_reuses_the_existing_linked_account(pool: PgPool) {
        let mut first_gateway = MockProviderGateway::new();
        first_gateway
            .expect_create_connected_account()
            .times(1)
            .returning(|_| Ok("acct_456".into()));
        first_gateway
            .expect_onboarding_link()
            .returning(|_| Ok(OnboardingLink { redirect_url: "first".into() }));

        let first_use_case = ConnectAccountStripeUseCase::new(
            pool.clone(),
            Arc::new(PostgresProviderLinkedAccountRepository::new()),
            Arc::new(first_gateway),
        );
        first_use_case.execute(UserId(2)).await.unwrap();

        let mut second_gateway = MockProviderGateway::new();
        second_gateway.expect_create_connected_account().times(0);
        second_gateway
            .expect_onboarding_link()
            .withf(|id| id == "acct_456")
            .returning(|_| Ok(OnboardingLink { redirect_url: "second".into() }));

        let second_use_case = ConnectAccountStripeUseCase::new(
            pool,
            Arc::new(PostgresProviderLinkedAccountRepository::new()),
            Arc::new(second_gateway),
        );
        let output = second_use_case.execute(UserId(2)).await.unwrap();
        assert_eq!(output.redirect_url, "second");
    }
}
