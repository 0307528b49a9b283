use async_trait::async_trait;
use common::error::WalletError;
use common::messages::{WalletTransactionRequest, WalletTransactionResult};

/// §4.3 consumer side's outbound traffic: the terminal result topic, the DLQ,
/// and republishing a retried work item back onto the request topic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BusProducer: Send + Sync {
    async fn publish_result(&self, result: &WalletTransactionResult) -> Result<(), WalletError>;

    async fn publish_to_dlq(&self, request: &WalletTransactionRequest) -> Result<(), WalletError>;

    async fn republish_request(&self, request: &WalletTransactionRequest) -> Result<(), WalletError>;
}
