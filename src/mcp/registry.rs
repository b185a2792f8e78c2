//! Tool registration and lookup.
//!
//! A tool is a capability record: name, description, argument schema and a handler.
//! The registry is filled once at startup and shared read-only afterwards.

use std::{collections::HashMap, future::Future, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Failure raised by a tool handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// Business-logic failure, surfaced verbatim as an application error.
    #[error("{0}")]
    Failed(String),
    /// Arguments passed the schema but do not decode into the tool's input.
    /// Reported as a protocol error, never as a tool result.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ExecutionError>;
}

/// Adapts an async closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ExecutionError>> + Send,
{
    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ExecutionError> {
        (self.0)(arguments).await
    }
}

#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ExecutionError>> + Send + 'static,
    {
        Self::new(name, description, input_schema, Arc::new(FnHandler(handler)))
    }

    /// Wire form used in `tools/list`.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
    #[error("tool '{0}' not found")]
    ToolNotFound(String),
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<ToolDescriptor>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }

        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(Arc::new(descriptor));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<ToolDescriptor>, RegistryError> {
        self.index
            .get(name)
            .map(|position| self.tools[*position].clone())
            .ok_or_else(|| RegistryError::ToolNotFound(name.to_string()))
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> &[Arc<ToolDescriptor>] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
