use std::time::Duration;

use async_trait::async_trait;
use common::error::WalletError;
use common::messages::WalletTransactionRequest;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};

use crate::domain::bus::BusProducer;

/// Producer side of §4.3. `acks=all` + `enable.idempotence=true` gives the
/// at-least-once delivery the worker's consumer is built to tolerate.
pub struct KafkaBusProducer {
    producer: FutureProducer,
    request_topic: String,
}

impl KafkaBusProducer {
    pub fn new(brokers: &str, request_topic: String) -> Result<Self, WalletError> {
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
        })
    }
}

#[async_trait]
impl BusProducer for KafkaBusProducer {
    async fn publish_request(&self, request: &WalletTransactionRequest) -> Result<(), WalletError> {
        request.validate()?;

        let key = request.wallet_id.to_string();
        let payload = serde_json::to_string(request)
            .map_err(|e| WalletError::BusError(format!("failed to serialize work item: {e}")))?;

        let record = FutureRecord::to(&self.request_topic)
            .key(&key)
            .payload(&payload);

        self.producer
            .send(record, Duration::from_secs(30))
            .await
            .map_err(|(e, _)| WalletError::BusError(format!("failed to publish work item: {e}")))?;

        Ok(())
    }
}
