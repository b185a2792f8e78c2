//! JSON-RPC protocol representations and formatting utilities
//!
//! Provides the request/response envelopes exchanged on the wire and the mapping of
//! protocol faults onto the fixed JSON-RPC error codes.

use rust_mcp_sdk::schema::RequestId;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes. Clients match on these values.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// A client usage fault, reported as a JSON-RPC `error` envelope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Method '{0}' not found")]
    MethodNotFound(String),
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),
    #[error("Missing required parameter: name")]
    MissingToolName,
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("Missing session ID")]
    SessionRequired,
    #[error("No valid session ID provided")]
    InvalidSession,
    #[error("Session not initialized")]
    SessionNotReady,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProtocolError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        match self {
            Self::Parse(_) => PARSE_ERROR,
            Self::InvalidRequest(_)
            | Self::SessionRequired
            | Self::InvalidSession
            | Self::SessionNotReady => INVALID_REQUEST,
            Self::MethodNotFound(_) | Self::ToolNotFound(_) | Self::MissingToolName => {
                METHOD_NOT_FOUND
            }
            Self::InvalidParams(_) => INVALID_PARAMS,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Machine-readable reason carried in `error.data.code`.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::MethodNotFound(_) => "method_not_found",
            Self::ToolNotFound(_) => "tool_not_found",
            Self::MissingToolName => "missing_tool_name",
            Self::InvalidParams(_) => "invalid_params",
            Self::SessionRequired => "session_required",
            Self::InvalidSession => "invalid_session",
            Self::SessionNotReady => "session_not_ready",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Session precondition failures are rejected with a client-error status by the transport.
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            Self::SessionRequired | Self::InvalidSession | Self::SessionNotReady
        )
    }

    pub fn to_error_object(&self) -> ErrorObject {
        let details = match self {
            Self::MethodNotFound(method) => json!({ "method": method }),
            Self::ToolNotFound(name) => json!({ "name": name }),
            _ => json!({}),
        };

        ErrorObject {
            code: self.code(),
            message: self.to_string(),
            data: Some(json!({
                "code": self.reason(),
                "details": details,
            })),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A decoded request envelope. `id == None` marks a notification.
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    pub id: Option<RequestId>,
    pub method: String,
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// `params` as an object; absent or `null` params read as empty.
    pub fn params_object(&self) -> Result<Map<String, Value>, ProtocolError> {
        match &self.params {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(ProtocolError::InvalidParams(
                "params must be an object".to_string(),
            )),
        }
    }
}

/// Exactly one of `result` or `error`, enforced by construction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    Result(Value),
    Error(ErrorObject),
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Option<RequestId>,
    #[serde(flatten)]
    payload: ResponsePayload,
}

impl JsonRpcResponse {
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            payload: ResponsePayload::Result(result),
        }
    }

    pub fn failure(id: Option<RequestId>, error: &ProtocolError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            payload: ResponsePayload::Error(error.to_error_object()),
        }
    }

    pub fn error(&self) -> Option<&ErrorObject> {
        match &self.payload {
            ResponsePayload::Error(error) => Some(error),
            ResponsePayload::Result(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not JSON at all; a transport-level failure.
    #[error("request body is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    /// Valid JSON that is not a request envelope; a protocol-level failure.
    #[error("{error}")]
    Invalid {
        id: Option<RequestId>,
        error: ProtocolError,
    },
}

pub fn decode_request(body: &[u8]) -> Result<JsonRpcRequest, DecodeError> {
    let payload: Value = serde_json::from_slice(body).map_err(DecodeError::Malformed)?;
    decode_request_value(payload)
}

pub fn decode_request_value(payload: Value) -> Result<JsonRpcRequest, DecodeError> {
    let invalid = |id: Option<RequestId>, message: &str| DecodeError::Invalid {
        id,
        error: ProtocolError::InvalidRequest(message.to_string()),
    };

    let mut object = match payload {
        Value::Object(object) => object,
        Value::Array(_) => return Err(invalid(None, "batch requests are not supported")),
        _ => return Err(invalid(None, "request must be a JSON object")),
    };

    let id = match object.remove("id") {
        None | Some(Value::Null) => None,
        Some(value) => match value_to_request_id(&value) {
            Some(id) => Some(id),
            None => return Err(invalid(None, "id must be a string or an integer")),
        },
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(invalid(id, "jsonrpc must be \"2.0\""));
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) if !method.trim().is_empty() => method,
        _ => return Err(invalid(id, "method must be a non-empty string")),
    };

    let params = object.remove("params").filter(|params| !params.is_null());

    Ok(JsonRpcRequest { id, method, params })
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}
