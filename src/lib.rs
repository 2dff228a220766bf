//! cmdjail - Sandboxed command gateway
//!
//! Lets an untrusted caller (typically an LLM agent) run single commands
//! under an allow-list policy, confined to one directory tree, without ever
//! invoking a shell.
//!
//! # Architecture
//!
//! - **policy**: immutable allow-lists and limits
//! - **tools**: parser, validator, path guard, runner, gateway, dispatcher
//! - **server**: line-delimited JSON tool server over stdio
//! - **telemetry**: explicit event collector handed to the gateway
//! - **cli**: argument parsing and configuration loading

pub mod errors;
pub mod policy;
pub mod tools;

// Re-export commonly used types
pub use errors::{GatewayError, Result, SecurityError};
pub use policy::{AllowList, PolicySummary, SecurityPolicy};
pub use tools::{Gateway, ToolDispatcher};

pub mod telemetry;
pub mod server;
pub mod cli;
