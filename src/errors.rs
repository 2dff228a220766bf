//! Error types for cmdjail
//!
//! Two layers: `SecurityError` covers every policy rejection (the command
//! never ran), `GatewayError` adds the operational failures that can happen
//! once a command has been approved.

use thiserror::Error;

/// Policy rejection. A request failing with one of these was never executed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// Command name is not on the allow-list
    #[error("Command '{0}' is not allowed")]
    CommandNotAllowed(String),

    /// Flag is not on the allow-list
    #[error("Flag '{0}' is not allowed")]
    FlagNotAllowed(String),

    /// Resolved path lies outside the allowed root
    #[error("Path '{path}' is outside of allowed directory: {root}")]
    PathEscape { path: String, root: String },

    /// Path could not be resolved
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Tokenization failed or produced nothing
    #[error("Invalid command format: {0}")]
    MalformedCommand(String),

    /// Raw string contains a shell operator
    #[error("Shell operator '{0}' is not supported")]
    ShellOperatorRejected(String),

    /// Raw string exceeds the configured length
    #[error("Command exceeds maximum length of {max}")]
    CommandTooLong { length: usize, max: usize },
}

impl SecurityError {
    /// Short stable name for telemetry
    pub fn kind(&self) -> &'static str {
        match self {
            SecurityError::CommandNotAllowed(_) => "command_not_allowed",
            SecurityError::FlagNotAllowed(_) => "flag_not_allowed",
            SecurityError::PathEscape { .. } => "path_escape",
            SecurityError::InvalidPath { .. } => "invalid_path",
            SecurityError::MalformedCommand(_) => "malformed_command",
            SecurityError::ShellOperatorRejected(_) => "shell_operator_rejected",
            SecurityError::CommandTooLong { .. } => "command_too_long",
        }
    }
}

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Rejected by policy
    #[error("Security violation: {0}")]
    Security(#[from] SecurityError),

    /// Child exceeded its wall-clock budget and was killed
    #[error("Command timed out after {seconds} seconds")]
    CommandTimeout { seconds: u64 },

    /// Child could not be started or waited on
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Gateway error: {0}")]
    Generic(String),
}

impl GatewayError {
    /// Whether the request was refused by policy rather than failing at runtime
    pub fn is_security(&self) -> bool {
        matches!(self, GatewayError::Security(_))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Convert anyhow errors to GatewayError
impl From<anyhow::Error> for GatewayError {
    fn from(err: anyhow::Error) -> Self {
        GatewayError::Generic(err.to_string())
    }
}
