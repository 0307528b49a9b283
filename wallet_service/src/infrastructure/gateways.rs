pub mod cloudpayments_gateway;
pub mod stripe_gateway;
