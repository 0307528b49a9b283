use async_trait::async_trait;
use common::error::WalletError;
use common::messages::WalletTransactionRequest;

/// §4.3 producer side. Partitioned by `wallet_id` so a single wallet's work
/// items stay strictly ordered.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BusProducer: Send + Sync {
    async fn publish_request(&self, request: &WalletTransactionRequest) -> Result<(), WalletError>;
}
