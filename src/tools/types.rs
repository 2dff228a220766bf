//! Command and tool-call types
//!
//! Core types flowing through the parse -> validate -> run pipeline, and the
//! text-segment response contract returned to the calling agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tokenized command, not yet checked against policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: String,
    pub arguments: Vec<String>,
}

impl ParsedCommand {
    pub fn new(command: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            command: command.into(),
            arguments,
        }
    }
}

/// Command that passed policy checks
///
/// Path-like arguments hold their canonical absolute form. Only the
/// validator constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCommand {
    command: String,
    arguments: Vec<String>,
}

impl ValidatedCommand {
    pub(crate) fn new(command: String, arguments: Vec<String>) -> Self {
        Self { command, arguments }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Full argv: command followed by arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.command.clone())
            .chain(self.arguments.iter().cloned())
            .collect()
    }
}

/// Captured result of a finished child process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,

    /// Exit code, `-1` when the process was terminated by a signal
    pub exit_code: i32,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// One text segment of a tool response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(default)]
    pub error: bool,
}

impl TextSegment {
    /// Informational segment
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
            error: false,
        }
    }

    /// Segment flagged as an error
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
            error: true,
        }
    }
}

/// Ordered response to a tool call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<TextSegment>,
}

impl ToolResponse {
    /// Response consisting of a single error segment
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            content: vec![TextSegment::error(message)],
        }
    }

    /// Response consisting of a single informational segment
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            content: vec![TextSegment::text(message)],
        }
    }

    /// Response for a completed process
    ///
    /// stdout (if any), stderr flagged as error (if any), then the exit code.
    pub fn from_execution(result: &ExecutionResult) -> Self {
        let mut content = Vec::new();

        if !result.stdout.is_empty() {
            content.push(TextSegment::text(result.stdout.clone()));
        }
        if !result.stderr.is_empty() {
            content.push(TextSegment::error(result.stderr.clone()));
        }
        content.push(TextSegment::text(format!(
            "\nCommand completed with return code: {}",
            result.exit_code
        )));

        Self { content }
    }

    /// Whether any segment is flagged as an error
    pub fn is_error(&self) -> bool {
        self.content.iter().any(|segment| segment.error)
    }
}

/// Execution context shared by all requests
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Working directory for children (the canonical allowed root)
    pub working_dir: PathBuf,

    /// Wall-clock limit per child
    pub timeout: Duration,
}

impl ToolContext {
    /// Create new tool context with working directory
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            timeout: Duration::from_secs(crate::policy::DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Tool schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// Parameter schema (JSON Schema)
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,

    /// Whether the tool is free of side effects
    #[serde(skip)]
    pub read_only: bool,
}

impl ToolSchema {
    /// Create new tool schema
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        read_only: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            read_only,
        }
    }
}
