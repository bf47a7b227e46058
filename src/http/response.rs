//! JSON responses and error mapping for the API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::mint::MintError;

/// Body returned by `POST /api/mint` on success.
#[derive(Debug, Serialize)]
pub struct MintResponse {
    pub tx_hash: String,
    pub explorer_url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

/// Error wrapper that renders as a JSON body with a mapped status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                error: message.into(),
                kind: "internal",
            },
        }
    }
}

/// HTTP status for each mint failure category.
pub fn status_for(error: &MintError) -> StatusCode {
    match error {
        MintError::NotConnected | MintError::InvalidWallet(_) => StatusCode::BAD_REQUEST,
        MintError::InProgress => StatusCode::CONFLICT,
        MintError::Connection(_)
        | MintError::Build(_)
        | MintError::Signing(_)
        | MintError::Submit(_) => StatusCode::BAD_GATEWAY,
        MintError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<MintError> for ApiError {
    fn from(error: MintError) -> Self {
        Self {
            status: status_for(&error),
            body: ErrorBody {
                error: error.to_string(),
                kind: error.kind(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::BlockchainError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&MintError::NotConnected), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&MintError::InProgress), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&MintError::Submit(BlockchainError::Timeout(30))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_wallet_selection_errors_are_client_errors() {
        assert_eq!(
            status_for(&MintError::InvalidWallet("unknown wallet 'eternl'".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&MintError::Connection("Invalid project token.".into())),
            StatusCode::BAD_GATEWAY
        );
    }
}
