//! Model Context Protocol (MCP) engine
//!
//! Session lifecycle, JSON-RPC envelopes and dispatch, the tool registry with its argument
//! validation, the worker pool that runs tools and the event-stream framing of replies.

pub mod adapter;
pub mod registry;
pub mod rpc;
pub mod schema;
pub mod server;
pub mod session;
pub mod stream;
