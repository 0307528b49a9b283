use std::env;
use std::sync::Arc;
use std::time::Duration;

use common::config::AppConfig;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use wallet_service::{
    api::{
        grpc_service::WalletGrpcService,
        http_routes::{self, routes, AppState},
        proto::wallet::wallet_server::WalletServer,
    },
    domain::gateway::ProviderGateways,
    domain::provider_balance::ProviderBalanceManager,
    infrastructure::{
        bus::kafka_producer::KafkaBusProducer,
        cache::redis_cache::RedisIdempotencyCache,
        gateways::{cloudpayments_gateway::CloudpaymentsGateway, stripe_gateway::StripeGateway},
        persistence::{
            currency_repository::PostgresCurrencyRepository,
            provider_balance_repository::PostgresProviderBalanceRepository,
            provider_linked_account_repository::PostgresProviderLinkedAccountRepository,
            transaction_repository::PostgresTransactionRepository,
            wallet_account_repository::PostgresWalletAccountRepository,
            wallet_repository::PostgresWalletRepository,
        },
    },
    jobs::fx_refresher::FxRefresherJob,
    use_cases::{
        connect_account_stripe::ConnectAccountStripeUseCase, convert::ConvertUseCase,
        create_payment_transaction::CreatePaymentTransactionUseCase,
        create_wallet::CreateWalletUseCase,
        create_withdraw_transaction::CreateWithdrawTransactionUseCase,
        get_balance::GetBalanceUseCase, handle_stripe_payment::HandleStripePaymentUseCase,
        handle_stripe_payout::HandleStripePayoutUseCase, transfer::TransferUseCase,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        wallet_service::api::http_routes::create_wallet,
        wallet_service::api::http_routes::get_balance,
        wallet_service::api::http_routes::transfer,
        wallet_service::api::http_routes::convert,
        wallet_service::api::http_routes::create_payment_transaction,
        wallet_service::api::http_routes::create_withdraw_transaction,
        wallet_service::api::http_routes::connect_account_stripe,
        wallet_service::api::http_routes::handle_stripe_payment,
        wallet_service::api::http_routes::handle_stripe_payout,
    ),
    components(schemas(
        http_routes::CreateWalletRequest,
        http_routes::CreateWalletResponseBody,
        http_routes::BalanceBody,
        http_routes::GetBalanceResponseBody,
        http_routes::TransferRequest,
        http_routes::ConvertRequest,
        http_routes::CreatePaymentTransactionRequest,
        http_routes::CreateWithdrawTransactionRequest,
        http_routes::ConnectAccountStripeRequest,
        http_routes::TransactionRef,
        http_routes::RedirectBody,
        http_routes::WebhookResponseBody,
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting wallet orchestrator...");

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.postgres_dsn)
        .await?;
    sqlx::migrate!().run(&pool).await?;
    info!("connected to Postgres and ran migrations");

    let cache: Arc<dyn wallet_service::domain::cache::IdempotencyCache> = Arc::new(
        RedisIdempotencyCache::connect(&config.redis_dsn, config.idempotency_key_prefix.clone()).await?,
    );
    let bus: Arc<dyn wallet_service::domain::bus::BusProducer> = Arc::new(KafkaBusProducer::new(
        &config.kafka_broker,
        config.request_topic.clone(),
    )?);
    info!("connected to Redis and Kafka");

    let wallets = Arc::new(PostgresWalletRepository::new());
    let accounts = Arc::new(PostgresWalletAccountRepository::new());
    let transactions = Arc::new(PostgresTransactionRepository::new());
    let currencies = Arc::new(PostgresCurrencyRepository::new());
    let provider_balances = Arc::new(PostgresProviderBalanceRepository::new());
    let linked_accounts = Arc::new(PostgresProviderLinkedAccountRepository::new());

    let stripe: Arc<dyn wallet_service::domain::gateway::ProviderGateway> = Arc::new(StripeGateway::new(
        config.stripe_secret_key.clone(),
        config.base_url.clone(),
        config.stripe_payment_webhook_secret.clone(),
        config.stripe_payout_webhook_secret.clone(),
    ));
    let cloudpayments: Arc<dyn wallet_service::domain::gateway::ProviderGateway> =
        Arc::new(CloudpaymentsGateway);
    let gateways = ProviderGateways {
        stripe: stripe.clone(),
        cloudpayments,
    };

    let provider_balance_manager = ProviderBalanceManager::new(provider_balances.clone(), currencies.clone());
    let idempotency_ttl = Duration::from_secs(config.idempotency_ttl_seconds);

    let create_wallet_uc = Arc::new(CreateWalletUseCase::new(pool.clone(), wallets.clone()));
    let get_balance_uc = Arc::new(GetBalanceUseCase::new(pool.clone(), wallets.clone(), accounts.clone()));
    let transfer_uc = Arc::new(TransferUseCase::new(
        pool.clone(),
        wallets.clone(),
        transactions.clone(),
        cache.clone(),
        bus.clone(),
        idempotency_ttl,
    ));
    let convert_uc = Arc::new(ConvertUseCase::new(
        pool.clone(),
        wallets.clone(),
        transactions.clone(),
        cache.clone(),
        bus.clone(),
        idempotency_ttl,
    ));
    let create_payment_transaction_uc = Arc::new(CreatePaymentTransactionUseCase::new(
        pool.clone(),
        wallets.clone(),
        transactions.clone(),
        cache.clone(),
        gateways.clone(),
        idempotency_ttl,
    ));
    let connect_account_stripe_uc = Arc::new(ConnectAccountStripeUseCase::new(
        pool.clone(),
        linked_accounts.clone(),
        stripe.clone(),
    ));
    let handle_stripe_payment_uc = Arc::new(HandleStripePaymentUseCase::new(
        pool.clone(),
        transactions.clone(),
        cache.clone(),
        bus.clone(),
        provider_balance_manager.clone(),
        idempotency_ttl,
    ));
    let handle_stripe_payout_uc = Arc::new(HandleStripePayoutUseCase::new(
        pool.clone(),
        transactions.clone(),
        cache.clone(),
        bus.clone(),
        provider_balance_manager.clone(),
        idempotency_ttl,
    ));
    let create_withdraw_transaction_uc = Arc::new(CreateWithdrawTransactionUseCase::new(
        pool.clone(),
        wallets.clone(),
        accounts.clone(),
        transactions.clone(),
        provider_balances.clone(),
        currencies.clone(),
        linked_accounts.clone(),
        cache.clone(),
        gateways.clone(),
        idempotency_ttl,
    ));

    let grpc_host = env::var("GRPC_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let grpc_port = env::var("GRPC_PORT").unwrap_or_else(|_| "50051".to_string());
    let grpc_addr = format!("{grpc_host}:{grpc_port}").parse()?;

    let grpc_service = WalletGrpcService {
        create_wallet: create_wallet_uc.clone(),
        get_balance: get_balance_uc.clone(),
        transfer: transfer_uc.clone(),
        convert: convert_uc.clone(),
        create_payment_transaction: create_payment_transaction_uc.clone(),
        connect_account_stripe: connect_account_stripe_uc.clone(),
        handle_stripe_payment: handle_stripe_payment_uc.clone(),
        handle_stripe_payout: handle_stripe_payout_uc.clone(),
        create_withdraw_transaction: create_withdraw_transaction_uc.clone(),
        stripe: stripe.clone(),
    };

    info!("gRPC server listening on {grpc_addr}");
    tokio::spawn(async move {
        if let Err(e) = tonic::transport::Server::builder()
            .add_service(WalletServer::new(grpc_service))
            .serve(grpc_addr)
            .await
        {
            tracing::error!("gRPC server error: {e}");
        }
    });

    let fx_source_url = env::var("FX_SOURCE_URL")
        .unwrap_or_else(|_| "https://www.cbr-xml-daily.ru/daily_json.js".to_string());
    let fx_job = FxRefresherJob::new(pool.clone(), currencies.clone(), fx_source_url);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            fx_job.run().await;
        }
    });

    let app_state = AppState {
        create_wallet: create_wallet_uc,
        get_balance: get_balance_uc,
        transfer: transfer_uc,
        convert: convert_uc,
        create_payment_transaction: create_payment_transaction_uc,
        connect_account_stripe: connect_account_stripe_uc,
        handle_stripe_payment: handle_stripe_payment_uc,
        handle_stripe_payout: handle_stripe_payout_uc,
        create_withdraw_transaction: create_withdraw_transaction_uc,
        stripe,
    };

    let app = routes(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{host}:{port}");

    info!("HTTP server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
