//! Zonos TTS Server
//!
//! HTTP endpoint for speech synthesis.

pub mod http;
pub mod state;

pub use http::create_router;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Synthesis(#[from] zonos_tts_core::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Where the request failed, as reported to the client
    pub fn stage(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "validation",
            ServerError::Synthesis(e) => e.stage(),
            ServerError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Synthesis(zonos_tts_core::Error::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Synthesis(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::Synthesis(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        err.status()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(stage = self.stage(), error = %self, "Request failed");
        } else {
            tracing::debug!(stage = self.stage(), error = %self, "Request rejected");
        }

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "stage": self.stage(),
        }));
        (status, body).into_response()
    }
}
