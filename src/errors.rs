use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Failures raised by the HTTP binding before any protocol logic runs.
///
/// These never take the JSON-RPC shape; protocol faults live in
/// [`crate::mcp::rpc::ProtocolError`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not acceptable: {message}")]
    NotAcceptable {
        code: &'static str,
        message: &'static str,
    },
    #[error("bad request: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("internal error")]
    Internal { code: &'static str, message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl AppError {
    pub fn not_acceptable(code: &'static str, message: &'static str) -> Self {
        Self::NotAcceptable { code, message }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::NotAcceptable { code, message } => {
                (StatusCode::NOT_ACCEPTABLE, code, message.to_string())
            }
            Self::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            Self::Internal { code, message } => {
                tracing::error!(error = %message, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    code,
                    "internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message,
                details: json!({}),
            }),
        )
            .into_response()
    }
}
