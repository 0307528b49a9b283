use std::sync::Arc;
use std::time::Duration;

use common::config::AppConfig;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use wallet_worker::{
    domain::bus::BusProducer,
    domain::cache::IdempotencyCache,
    infrastructure::{
        bus::{kafka_consumer::WalletConsumer, kafka_producer::KafkaBusProducer},
        cache::redis_cache::RedisIdempotencyCache,
        persistence::{
            currency_repository::PostgresCurrencyRepository,
            transaction_repository::PostgresTransactionRepository,
            wallet_account_repository::PostgresWalletAccountRepository,
        },
    },
    use_cases::process_transaction::ProcessTransactionUseCase,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting wallet settlement worker...");

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.postgres_dsn)
        .await?;
    info!("connected to Postgres");

    let cache: Arc<dyn IdempotencyCache> = Arc::new(
        RedisIdempotencyCache::connect(&config.redis_dsn, config.idempotency_key_prefix.clone()).await?,
    );
    let bus: Arc<dyn BusProducer> = Arc::new(KafkaBusProducer::new(
        &config.kafka_broker,
        config.request_topic.clone(),
        config.result_topic.clone(),
        config.dlq_topic.clone(),
    )?);
    info!("connected to Redis and Kafka");

    let accounts = Arc::new(PostgresWalletAccountRepository::new());
    let transactions = Arc::new(PostgresTransactionRepository::new());
    let currencies = Arc::new(PostgresCurrencyRepository::new());

    let use_case = Arc::new(ProcessTransactionUseCase::new(
        pool,
        accounts,
        transactions,
        currencies,
        cache,
        bus,
        Duration::from_secs(config.idempotency_ttl_seconds),
    ));

    let consumer = WalletConsumer::new(
        &config.kafka_broker,
        &config.kafka_consumer_group,
        &config.request_topic,
        use_case,
    )?;

    info!("consuming {}", config.request_topic);
    consumer.run().await;

    Ok(())
}
