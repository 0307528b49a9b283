use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for environment variable {0}: {1}")]
    Invalid(&'static str, String),
}

/// One flat configuration record, read once at process start. Deliberately
/// not a hierarchy of Postgres/Redis/Provider mix-ins: every field the
/// process needs lives here, and every field is read the same way.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub postgres_dsn: String,
    pub redis_dsn: String,
    pub kafka_broker: String,

    pub idempotency_key_prefix: String,
    pub idempotency_ttl_seconds: u64,

    pub stripe_secret_key: String,
    pub stripe_publishable_key: String,
    pub stripe_payment_webhook_secret: String,
    pub stripe_payout_webhook_secret: String,

    pub base_url: String,
    pub payment_test_mode: bool,

    pub request_topic: String,
    pub result_topic: String,
    pub dlq_topic: String,
    pub kafka_consumer_group: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            postgres_dsn: required("POSTGRES_DSN")?,
            redis_dsn: required("REDIS_DSN")?,
            kafka_broker: required("KAFKA_BROKER")?,

            idempotency_key_prefix: optional("IDEMPOTENCY_KEY_PREFIX", "wallet:idemp:"),
            idempotency_ttl_seconds: optional_parsed("IDEMPOTENCY_TTL_SECONDS", 24 * 3600)?,

            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_publishable_key: required("STRIPE_PUBLISHABLE_KEY")?,
            stripe_payment_webhook_secret: required("STRIPE_PAYMENT_WEBHOOK_SECRET")?,
            stripe_payout_webhook_secret: required("STRIPE_PAYOUT_WEBHOOK_SECRET")?,

            base_url: required("BASE_URL")?,
            payment_test_mode: optional_parsed("PAYMENT_TEST_MODE", false)?,

            request_topic: optional("WALLET_REQUEST_TOPIC", "wallet.transaction.request"),
            result_topic: optional("WALLET_RESULT_TOPIC", "wallet.transaction.result"),
            dlq_topic: optional("WALLET_DLQ_TOPIC", "wallet.transaction.dlq"),
            kafka_consumer_group: optional("KAFKA_CONSUMER_GROUP", "wallet-worker"),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional(key: &'static str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw.clone())),
        Err(_) => Ok(default),
    }
}
