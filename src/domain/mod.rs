//! User management domain exposed over the MCP protocol
//!
//! Backend payload models, the tool handlers delegating to the user service and the text
//! rendering of their results.

pub mod models;
pub mod tools;
pub mod utils;
