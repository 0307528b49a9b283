use common::config::AppConfig;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let config = AppConfig::from_env()?;

    println!("Connecting to {}...", config.postgres_dsn);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.postgres_dsn)
        .await
        .map_err(|e| format!("Failed to connect: {}", e))?;

    println!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| format!("Migration failed: {}", e))?;

    println!("wallet_db initialized successfully");
    Ok(())
}
