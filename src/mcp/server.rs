//! The central Model Context Protocol engine
//!
//! Enforces the session lifecycle, routes JSON-RPC methods to their handlers and maps
//! handler outcomes onto response envelopes. Knows nothing about HTTP: it takes a decoded
//! envelope plus the caller's session id and reports what the transport should send back.

use std::sync::Arc;

use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, RequestId, ServerCapabilities, ServerCapabilitiesTools,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::mcp::{
    adapter::ToolInvoker,
    registry::{ToolDefinition, ToolRegistry},
    rpc::{JsonRpcRequest, JsonRpcResponse, ProtocolError},
    schema,
    session::{SessionError, SessionId, SessionRequirement, SessionStore},
};

pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 1] = ["2024-11-05"];
pub const SERVER_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Initialized,
    Ping,
    ToolsList,
    ToolsCall,
    Unknown,
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "ping" => Self::Ping,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            _ => Self::Unknown,
        }
    }

    /// Session precondition checked before the handler runs; `None` for `initialize`.
    pub fn requirement(self) -> Option<SessionRequirement> {
        match self {
            Self::Initialize => None,
            Self::Initialized | Self::Ping | Self::Unknown => Some(SessionRequirement::Exists),
            Self::ToolsList | Self::ToolsCall => Some(SessionRequirement::Ready),
        }
    }
}

/// What the transport should emit for one request.
#[derive(Debug)]
pub enum Outcome {
    /// A correlated response envelope (result or protocol error).
    Respond(JsonRpcResponse),
    /// A session precondition failure; still an error envelope, sent with a client-error status.
    Reject(JsonRpcResponse),
    /// A processed notification: no body at all.
    Acknowledge,
    /// A fault that cannot be correlated with any request id; answered at the
    /// transport level without an envelope.
    Refuse(ProtocolError),
}

impl Outcome {
    pub fn response(&self) -> Option<&JsonRpcResponse> {
        match self {
            Self::Respond(response) | Self::Reject(response) => Some(response),
            Self::Acknowledge | Self::Refuse(_) => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Respond(response) if response.is_error() => "failure",
            Self::Respond(_) => "success",
            Self::Reject(_) | Self::Refuse(_) => "failure",
            Self::Acknowledge => "acknowledged",
        }
    }
}

#[derive(Debug)]
pub struct Dispatched {
    pub outcome: Outcome,
    /// Session to echo back to the caller, when one is known.
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolsListResult {
    tools: Vec<ToolDefinition>,
}

pub struct McpServer {
    sessions: Arc<SessionStore>,
    registry: ToolRegistry,
    invoker: ToolInvoker,
    identity: ServerIdentity,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, sessions: Arc<SessionStore>, invoker: ToolInvoker) -> Self {
        Self {
            sessions,
            registry,
            invoker,
            identity: ServerIdentity::default(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, request: JsonRpcRequest, session_id: Option<&str>) -> Dispatched {
        let audit_params = redact_audit_params(request.params.as_ref());
        let method = Method::parse(&request.method);

        let dispatched = match method.requirement() {
            None => self.handle_initialize(&request),
            Some(requirement) => {
                let session_id = session_id
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(SessionId::from);
                self.handle_in_session(method, &request, session_id, requirement)
                    .await
            }
        };

        info!(
            method = %request.method,
            params = %audit_params,
            outcome = dispatched.outcome.label(),
            "mcp action audited"
        );

        dispatched
    }

    async fn handle_in_session(
        &self,
        method: Method,
        request: &JsonRpcRequest,
        session_id: Option<SessionId>,
        requirement: SessionRequirement,
    ) -> Dispatched {
        let Some(session_id) = session_id else {
            return finish(request.id.clone(), Err(ProtocolError::SessionRequired), None);
        };

        match self.sessions.authorize(&session_id, requirement) {
            Ok(_) => {}
            Err(SessionError::NotFound(_)) => {
                return finish(request.id.clone(), Err(ProtocolError::InvalidSession), None);
            }
            Err(SessionError::NotReady(_)) => {
                return finish(
                    request.id.clone(),
                    Err(ProtocolError::SessionNotReady),
                    Some(session_id),
                );
            }
        }

        let result = match method {
            Method::Initialized => self
                .sessions
                .mark_ready(&session_id)
                .map(|()| json!({}))
                .map_err(|_| ProtocolError::InvalidSession),
            Method::Ping => Ok(json!({})),
            Method::ToolsList => self.handle_tools_list(),
            Method::ToolsCall => {
                let result = self.handle_tools_call(request).await;
                // Long tool calls count as activity up to their completion.
                if let Err(err) = self.sessions.touch(&session_id) {
                    debug!(error = %err, "session disappeared during tool call");
                }
                result
            }
            Method::Initialize | Method::Unknown => {
                Err(ProtocolError::MethodNotFound(request.method.clone()))
            }
        };

        if request.is_notification() {
            if let Err(error) = &result {
                debug!(method = %request.method, error = %error, "notification failed");
            }
        }

        finish(request.id.clone(), result, Some(session_id))
    }

    fn handle_initialize(&self, request: &JsonRpcRequest) -> Dispatched {
        if request.is_notification() {
            return Dispatched {
                outcome: Outcome::Refuse(ProtocolError::InvalidRequest(
                    "initialize must carry an id".to_string(),
                )),
                session_id: None,
            };
        }

        let result = request
            .params_object()
            .and_then(|params| negotiate_protocol_version(&params))
            .and_then(|protocol_version| {
                let initialize_result = InitializeResult {
                    server_info: Implementation {
                        name: self.identity.name.clone(),
                        version: self.identity.version.clone(),
                        title: None,
                        description: None,
                        icons: vec![],
                        website_url: None,
                    },
                    capabilities: ServerCapabilities {
                        tools: Some(ServerCapabilitiesTools {
                            list_changed: Some(false),
                        }),
                        ..Default::default()
                    },
                    protocol_version,
                    instructions: None,
                    meta: None,
                };
                serde_json::to_value(initialize_result)
                    .map_err(|err| ProtocolError::Internal(err.to_string()))
            });

        match result {
            Ok(result) => {
                let session_id = self.sessions.create();
                Dispatched {
                    outcome: Outcome::Respond(JsonRpcResponse::success(request.id.clone(), result)),
                    session_id: Some(session_id),
                }
            }
            Err(error) => finish(request.id.clone(), Err(error), None),
        }
    }

    fn handle_tools_list(&self) -> Result<Value, ProtocolError> {
        let tools = self
            .registry
            .list()
            .iter()
            .map(|tool| tool.definition())
            .collect();

        serde_json::to_value(ToolsListResult { tools })
            .map_err(|err| ProtocolError::Internal(err.to_string()))
    }

    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> Result<Value, ProtocolError> {
        let mut params = request.params_object()?;

        let name = match params.remove("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            _ => return Err(ProtocolError::MissingToolName),
        };

        let arguments = match params.remove("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(arguments)) => arguments,
            Some(_) => {
                return Err(ProtocolError::InvalidParams(
                    "arguments must be an object".to_string(),
                ))
            }
        };

        let tool = self
            .registry
            .lookup(&name)
            .map_err(|_| ProtocolError::ToolNotFound(name.clone()))?;

        schema::validate(&tool.input_schema, &Value::Object(arguments.clone()))
            .map_err(|violation| ProtocolError::InvalidParams(violation.to_string()))?;

        debug!(tool = %name, "invoking tool");
        let outcome = self
            .invoker
            .invoke(tool, arguments)
            .await
            .map_err(|rejected| ProtocolError::InvalidParams(format!("arguments: {rejected}")))?;
        serde_json::to_value(outcome).map_err(|err| ProtocolError::Internal(err.to_string()))
    }
}

/// Session failures are always reported; other results of a notification are dropped.
fn finish(
    id: Option<RequestId>,
    result: Result<Value, ProtocolError>,
    session_id: Option<SessionId>,
) -> Dispatched {
    let outcome = match result {
        Err(error) if error.is_session_failure() => {
            Outcome::Reject(JsonRpcResponse::failure(id, &error))
        }
        _ if id.is_none() => Outcome::Acknowledge,
        Ok(result) => Outcome::Respond(JsonRpcResponse::success(id, result)),
        Err(error) => Outcome::Respond(JsonRpcResponse::failure(id, &error)),
    };

    Dispatched {
        outcome,
        session_id,
    }
}

/// Echoes a supported offered version, otherwise answers with the server's own.
pub fn negotiate_protocol_version(params: &Map<String, Value>) -> Result<String, ProtocolError> {
    match params.get("protocolVersion") {
        None | Some(Value::Null) => Ok(SERVER_PROTOCOL_VERSION.to_string()),
        Some(Value::String(offered)) => {
            let offered = offered.trim();
            if SUPPORTED_PROTOCOL_VERSIONS.contains(&offered) {
                Ok(offered.to_string())
            } else {
                Ok(SERVER_PROTOCOL_VERSION.to_string())
            }
        }
        Some(_) => Err(ProtocolError::InvalidParams(
            "protocolVersion must be a string".to_string(),
        )),
    }
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "cvv" | "api_key" | "apikey" | "credit_card"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}
