pub mod currency_repository;
pub mod models;
pub mod provider_balance_repository;
pub mod provider_linked_account_repository;
pub mod transaction_repository;
pub mod wallet_account_repository;
pub mod wallet_repository;
