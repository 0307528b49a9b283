use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use common::error::WalletError;
use serde_json::json;

/// Wraps the domain error for the HTTP mirror. The gRPC surface maps the
/// same `WalletError` to a `tonic::Status` via `to_tonic_status` instead,
/// since the two transports disagree on status vocabulary (§7).
pub struct ApiError(pub WalletError);

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WalletError::NoWallet(_) | WalletError::WalletNotFound(_) => StatusCode::NOT_FOUND,
            WalletError::IdempotentlyDone(_) | WalletError::InvalidData(_) => StatusCode::BAD_REQUEST,
            WalletError::NoProviderAccount(_) => StatusCode::SERVICE_UNAVAILABLE,
            WalletError::InsufficientFunds(_) | WalletError::ProviderLiquidityExhausted => {
                StatusCode::PRECONDITION_FAILED
            }
            WalletError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            WalletError::StorageError(_)
            | WalletError::BusError(_)
            | WalletError::CacheError(_)
            | WalletError::ProviderError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "status": "error",
            "message": self.0.to_string(),
            "detail": serde_json::Value::Null,
        }));

        (status, body).into_response()
    }
}

/// §7's error taxonomy, restated in gRPC status codes for the RPC surface.
pub fn to_tonic_status(err: WalletError) -> tonic::Status {
    let message = err.to_string();
    let code = match err {
        WalletError::NoWallet(_) | WalletError::WalletNotFound(_) => tonic::Code::NotFound,
        WalletError::IdempotentlyDone(_) | WalletError::InvalidData(_) => tonic::Code::InvalidArgument,
        WalletError::NoProviderAccount(_) => tonic::Code::Unavailable,
        WalletError::InsufficientFunds(_) | WalletError::ProviderLiquidityExhausted => {
            tonic::Code::FailedPrecondition
        }
        WalletError::Unsupported(_) => tonic::Code::Unimplemented,
        WalletError::StorageError(_)
        | WalletError::BusError(_)
        | WalletError::CacheError(_)
        | WalletError::ProviderError(_) => tonic::Code::Internal,
    };
    tonic::Status::new(code, message)
}
