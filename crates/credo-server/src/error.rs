//! API error mapping.
//!
//! The caller always receives a structured error body. Validation
//! problems are the client's fault (4xx); only infrastructure faults and
//! FAILED sessions produce a 5xx.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use credo_core::ValidationError;
use credo_runtime::{providers::ProviderError, OrchestratorError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("session {0} not found")]
    SessionNotFound(uuid::Uuid),

    #[error("analysis failed; retry the request")]
    AnalysisFailed,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Orchestrator(OrchestratorError::Validation(err)) => match err {
                ValidationError::MissingIdentifier { .. }
                | ValidationError::InvalidAmount(_)
                | ValidationError::MalformedGstin(_)
                | ValidationError::MalformedInvoiceRef(_) => StatusCode::BAD_REQUEST,
                ValidationError::IdentifierMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ApiError::Orchestrator(OrchestratorError::Provider(err)) => match err {
                ProviderError::InvoiceNotFound(_)
                | ProviderError::BuyerNotFound(_)
                | ProviderError::MerchantNotFound(_) => StatusCode::NOT_FOUND,
                ProviderError::Lookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Orchestrator(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AnalysisFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
