pub mod currency_repository;
pub mod models;
pub mod transaction_repository;
pub mod wallet_account_repository;
