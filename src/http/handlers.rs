//! Axum HTTP handlers for the web server
//!
//! Provides the Model Context Protocol endpoint, a health probe and the discovery document.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::debug;

use crate::errors::AppError;
use crate::mcp::{
    rpc::{decode_request, DecodeError, JsonRpcResponse, ProtocolError},
    server::{Dispatched, Outcome},
    stream::{EncodedReply, EventStream, EVENT_STREAM_CONTENT_TYPE},
};
use crate::{AppState, MCP_ENDPOINT, MCP_SESSION_ID_HEADER};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub mcp_endpoint: &'static str,
    pub session_header: &'static str,
    pub tools: usize,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        mcp_endpoint: MCP_ENDPOINT,
        session_header: "Mcp-Session-Id",
        tools: state.server.registry().len(),
    })
}

pub async fn mcp_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if !accepts_event_stream(&headers) {
        return Err(AppError::not_acceptable(
            "not_acceptable",
            "Accept header must include application/json and text/event-stream",
        ));
    }

    let request = match decode_request(&body) {
        Ok(request) => request,
        Err(DecodeError::Malformed(err)) => {
            let error = ProtocolError::Parse(err.to_string());
            return Err(AppError::bad_request(error.reason(), error.to_string()));
        }
        Err(DecodeError::Invalid { id: Some(id), error }) => {
            debug!(error = %error, "rejected invalid request envelope");
            let response = JsonRpcResponse::failure(Some(id), &error);
            return stream_response(StatusCode::OK, &response);
        }
        // Without an id there is nothing to correlate, so no envelope is sent.
        Err(DecodeError::Invalid { id: None, error }) => {
            return Err(AppError::bad_request(error.reason(), error.to_string()));
        }
    };

    let session_id = headers
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let Dispatched {
        outcome,
        session_id,
    } = state.server.dispatch(request, session_id).await;
    let session_header = session_id
        .as_ref()
        .and_then(|id| HeaderValue::from_str(id.as_str()).ok());

    let (status, reply) = match outcome {
        Outcome::Respond(response) => (StatusCode::OK, encode(&response)?),
        Outcome::Reject(response) => (StatusCode::BAD_REQUEST, encode(&response)?),
        Outcome::Acknowledge => (StatusCode::ACCEPTED, EncodedReply::Acknowledged),
        Outcome::Refuse(error) => {
            return Err(AppError::bad_request(error.reason(), error.to_string()));
        }
    };

    Ok(match reply {
        EncodedReply::Stream(stream) => event_stream_response(status, stream, session_header),
        EncodedReply::Acknowledged => {
            let mut response = status.into_response();
            if let Some(value) = session_header {
                response.headers_mut().insert(MCP_SESSION_ID_HEADER, value);
            }
            response
        }
    })
}

/// Both media types must be listed; parameters such as `q` are ignored.
pub fn accepts_event_stream(headers: &HeaderMap) -> bool {
    let mut json = false;
    let mut event_stream = false;

    for value in headers.get_all(header::ACCEPT) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for media_type in value.split(',') {
            let media_type = media_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            match media_type.as_str() {
                "application/json" => json = true,
                EVENT_STREAM_CONTENT_TYPE => event_stream = true,
                _ => {}
            }
        }
    }

    json && event_stream
}

fn encode(response: &JsonRpcResponse) -> Result<EncodedReply, AppError> {
    EventStream::single(response)
        .map(EncodedReply::Stream)
        .map_err(|err| AppError::internal(format!("failed to encode response frame: {err}")))
}

fn stream_response(status: StatusCode, response: &JsonRpcResponse) -> Result<Response, AppError> {
    let stream = EventStream::single(response)
        .map_err(|err| AppError::internal(format!("failed to encode response frame: {err}")))?;
    Ok(event_stream_response(status, stream, None))
}

fn event_stream_response(
    status: StatusCode,
    stream: EventStream,
    session_header: Option<HeaderValue>,
) -> Response {
    let mut response = Response::new(Body::from_stream(stream.into_stream()));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Some(value) = session_header {
        headers.insert(MCP_SESSION_ID_HEADER, value);
    }
    response
}
