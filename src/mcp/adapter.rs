//! Tool invocation adapter
//!
//! Runs a tool's handler on its own task, bounded by a fixed number of permits, and folds
//! every outcome into a `CallToolResult`. Handler failures (including panics) become
//! `isError: true` results. The one exception is arguments the handler cannot decode,
//! which are handed back so the dispatcher can answer with invalid params.

use std::sync::Arc;

use rust_mcp_sdk::schema::{CallToolResult, ContentBlock, TextContent};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::mcp::registry::{ExecutionError, ToolDescriptor};

pub const DEFAULT_MAX_CONCURRENT_TOOLS: usize = 16;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct RejectedArguments {
    pub tool: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ToolInvoker {
    permits: Arc<Semaphore>,
}

impl Default for ToolInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_TOOLS)
    }
}

impl ToolInvoker {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Arguments are expected to have passed schema validation already.
    pub async fn invoke(
        &self,
        tool: Arc<ToolDescriptor>,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, RejectedArguments> {
        let name = tool.name.clone();
        let Ok(permit) = self.permits.clone().acquire_owned().await else {
            return Ok(error_result(format!(
                "Tool execution error: no worker available for '{name}'"
            )));
        };

        // The spawned task owns the permit, so an abandoned request still frees it on completion.
        let execution = tokio::spawn(async move {
            let _permit = permit;
            tool.handler.execute(arguments).await
        });

        let result = match execution.await {
            Ok(Ok(text)) => text_result(text),
            Ok(Err(ExecutionError::InvalidArguments(reason))) => {
                debug!(tool = %name, reason = %reason, "tool rejected its arguments");
                return Err(RejectedArguments { tool: name, reason });
            }
            Ok(Err(failure)) => {
                warn!(tool = %name, error = %failure, "tool execution failed");
                error_result(format!("Tool execution error: {failure}"))
            }
            Err(join_error) => {
                error!(tool = %name, error = %join_error, "tool task aborted");
                let reason = if join_error.is_panic() {
                    "panicked"
                } else {
                    "was cancelled"
                };
                error_result(format!("Tool execution error: tool '{name}' {reason}"))
            }
        };
        Ok(result)
    }
}

pub fn text_result(text: String) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: None,
        meta: None,
        structured_content: None,
    }
}

pub fn error_result(text: String) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}
