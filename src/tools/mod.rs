//! Sandboxed command tooling
//!
//! Parse -> validate -> run pipeline behind a single gateway:
//! - Shell-free tokenization with operator rejection
//! - Allow-list policy for commands and flags
//! - Path guard confining every path argument to one root
//! - Direct process execution with a hard timeout
//! - Tool registry and dispatcher for the agent-facing surface

pub mod types;
pub mod security;
pub mod parser;
pub mod validator;
pub mod runner;
pub mod gateway;
pub mod registry;
pub mod executor;

// Re-export commonly used types
pub use types::{ExecutionResult, ParsedCommand, TextSegment, ToolResponse, ToolSchema, ValidatedCommand};
pub use security::PathGuard;
pub use gateway::Gateway;
pub use registry::ToolRegistry;
pub use executor::ToolDispatcher;
