use std::sync::Arc;
use std::time::Duration;

use common::error::WalletError;
use common::messages::WalletTransactionRequest;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use tracing::{error, info, warn};

use crate::use_cases::process_transaction::{ProcessTransactionUseCase, MAX_RETRIES};

/// §4.3/§4.7: one `StreamConsumer` per worker process, bound to the request
/// topic's partitions assigned by the group coordinator. `enable.auto.commit`
/// stays off; an offset only advances once its message has been settled,
/// DLQ'd, or requeued, per the at-least-once contract.
pub struct WalletConsumer {
    consumer: StreamConsumer,
    use_case: Arc<ProcessTransactionUseCase>,
    settle_timeout: Duration,
}

impl WalletConsumer {
    pub fn new(
        brokers: &str,
        group_id: &str,
        request_topic: &str,
        use_case: Arc<ProcessTransactionUseCase>,
    ) -> Result<Self, WalletError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "120000")
            .set("heartbeat.interval.ms", "30000")
            .set("max.poll.interval.ms", "300000")
            .create()
            .map_err(|e| WalletError::BusError(format!("failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[request_topic])
            .map_err(|e| WalletError::BusError(format!("failed to subscribe to {request_topic}: {e}")))?;

        Ok(Self {
            consumer,
            use_case,
            settle_timeout: Duration::from_secs(30),
        })
    }

    /// Runs until the process is killed. One message at a time, in arrival
    /// order, within whatever partitions this instance was assigned; strict
    /// per-partition ordering is the whole point of keying work items by
    /// `wallet_id`.
    pub async fn run(&self) {
        loop {
            match self.consumer.recv().await {
                Ok(message) => {
                    self.handle(message.payload()).await;
                    if let Err(e) = self.consumer.commit_message(&message, CommitMode::Async) {
                        error!("failed to commit offset: {e}");
                    }
                }
                Err(e) => error!("kafka receive error: {e}"),
            }
        }
    }

    async fn handle(&self, payload: Option<&[u8]>) {
        let Some(payload) = payload else {
            warn!("work item with empty payload, skipping");
            return;
        };

        let request: WalletTransactionRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(e) => {
                error!("unreadable work item, skipping: {e}");
                return;
            }
        };

        if request.retries >= MAX_RETRIES {
            if let Err(e) = self.use_case.fail_via_dlq(&request).await {
                error!("failed to route exhausted work item {} to dlq: {e}", request.transaction_id);
            }
            return;
        }

        match tokio::time::timeout(self.settle_timeout, self.use_case.settle(&request)).await {
            Ok(Ok(())) => {
                info!(
                    "settled {:?} for wallet {} (correlation {})",
                    request.operation, request.wallet_id, request.correlation_id
                );
            }
            Ok(Err(e)) => {
                warn!("settlement failed for transaction {}, requeueing: {e}", request.transaction_id);
                self.requeue(&request).await;
            }
            Err(_) => {
                warn!("settlement timed out for transaction {}, requeueing", request.transaction_id);
                self.requeue(&request).await;
            }
        }
    }

    async fn requeue(&self, request: &WalletTransactionRequest) {
        if let Err(e) = self.use_case.requeue(request).await {
            error!("failed to requeue transaction {}: {e}", request.transaction_id);
        }
    }
}
