pub mod process_transaction;
