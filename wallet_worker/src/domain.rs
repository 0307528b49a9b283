pub mod bus;
pub mod cache;
pub mod repository;
