use std::time::Duration;

use async_trait::async_trait;
use common::error::WalletError;
use common::messages::{WalletTransactionRequest, WalletTransactionResult};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};

use crate::domain::bus::BusProducer;

/// §4.3's three outbound topics, sharing one producer: the result topic,
/// the DLQ, and the request topic again for retries.
pub struct KafkaBusProducer {
    producer: FutureProducer,
    request_topic: String,
    result_topic: String,
    dlq_topic: String,
}

impl KafkaBusProducer {
    pub fn new(
        brokers: &str,
        request_topic: String,
        result_topic: String,
        dlq_topic: String,
    ) -> Result<Self, WalletError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("compression.type", "snappy")
            .set("linger.ms", "10")
            .create()
            .map_err(|e| WalletError::BusError(format!("failed to create producer: {e}")))?;

        Ok(Self {
            producer,
            request_topic,
            result_topic,
            dlq_topic,
        })
    }

    async fn send_to(&self, topic: &str, key: &str, payload: &str) -> Result<(), WalletError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);
        self.producer
            .send(record, Duration::from_secs(30))
            .await
            .map_err(|(e, _)| WalletError::BusError(format!("failed to publish to {topic}: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl BusProducer for KafkaBusProducer {
    async fn publish_result(&self, result: &WalletTransactionResult) -> Result<(), WalletError> {
        let key = result.wallet_id.to_string();
        let payload = serde_json::to_string(result)
            .map_err(|e| WalletError::BusError(format!("failed to serialize result: {e}")))?;
        self.send_to(&self.result_topic, &key, &payload).await
    }

    async fn publish_to_dlq(&self, request: &WalletTransactionRequest) -> Result<(), WalletError> {
        let key = request.wallet_id.to_string();
        let payload = serde_json::to_string(request)
            .map_err(|e| WalletError::BusError(format!("failed to serialize work item: {e}")))?;
        self.send_to(&self.dlq_topic, &key, &payload).await
    }

    async fn republish_request(&self, request: &WalletTransactionRequest) -> Result<(), WalletError> {
        request.validate()?;
        let key = request.wallet_id.to_string();
        let payload = serde_json::to_string(request)
            .map_err(|e| WalletError::BusError(format!("failed to serialize work item: {e}")))?;
        self.send_to(&self.request_topic, &key, &payload).await
    }
}
