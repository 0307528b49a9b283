pub mod bus;
pub mod cache;
pub mod gateway;
pub mod idempotency;
pub mod provider_balance;
pub mod repository;
