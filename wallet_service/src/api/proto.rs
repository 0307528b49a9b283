pub mod wallet {
    tonic::include_proto!("wallet");
}
