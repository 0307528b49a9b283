pub mod connect_account_stripe;
pub mod convert;
pub mod create_payment_transaction;
pub mod create_wallet;
pub mod create_withdraw_transaction;
pub mod get_balance;
pub mod handle_stripe_payment;
pub mod handle_stripe_payout;
pub mod transfer;
