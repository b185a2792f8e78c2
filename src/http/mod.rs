//! HTTP transport binding for the Model Context Protocol
//!
//! Accept negotiation, session header handling and event-stream responses for `/mcp`,
//! plus the health and discovery endpoints.

pub mod handlers;
