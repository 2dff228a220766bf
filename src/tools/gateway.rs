//! Command gateway
//!
//! Public entry point composing the pipeline:
//! length check -> parse -> validate -> run.
//! Every failure is converted into a text response at this boundary.

use crate::errors::{GatewayError, Result, SecurityError};
use crate::policy::{PolicySummary, SecurityPolicy};
use crate::telemetry::{GatewayEvent, TelemetryCollector};
use crate::tools::parser;
use crate::tools::runner;
use crate::tools::security::PathGuard;
use crate::tools::types::{ExecutionResult, ToolContext, ToolResponse, ValidatedCommand};
use crate::tools::validator;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Sandboxed command gateway
///
/// Cheap to share: the policy and guard are immutable after construction,
/// so concurrent requests need no locking.
pub struct Gateway {
    policy: Arc<SecurityPolicy>,
    guard: PathGuard,
    context: ToolContext,
    telemetry: TelemetryCollector,
}

impl Gateway {
    /// Create a gateway confined to `allowed_dir`
    pub fn new(
        allowed_dir: impl AsRef<Path>,
        policy: SecurityPolicy,
        telemetry: TelemetryCollector,
    ) -> Result<Self> {
        let guard = PathGuard::new(allowed_dir)?;
        let context =
            ToolContext::new(guard.root().to_path_buf()).with_timeout(policy.command_timeout);

        Ok(Self {
            policy: Arc::new(policy),
            guard,
            context,
            telemetry,
        })
    }

    /// Check a raw command against policy without running it
    pub fn prepare(&self, raw: &str) -> std::result::Result<ValidatedCommand, SecurityError> {
        let length = raw.chars().count();
        if length > self.policy.max_command_length {
            return Err(SecurityError::CommandTooLong {
                length,
                max: self.policy.max_command_length,
            });
        }

        let parsed = parser::parse(raw)?;
        validator::validate(&parsed, &self.policy, &self.guard)
    }

    /// Validate and execute a raw command string
    ///
    /// # Flow
    /// 1. Reject over-long input before any parsing
    /// 2. Parse (shell operators rejected outright)
    /// 3. Validate against the policy, canonicalizing paths
    /// 4. Run without a shell inside the allowed root
    pub async fn execute(&self, raw: &str) -> Result<ExecutionResult> {
        let request_id = Uuid::new_v4();
        self.telemetry.record(GatewayEvent::CommandReceived {
            request_id,
            length: raw.chars().count(),
            timestamp: Instant::now(),
        });

        let validated = match self.prepare(raw) {
            Ok(validated) => validated,
            Err(e) => {
                self.telemetry.record(GatewayEvent::CommandRejected {
                    request_id,
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                    timestamp: Instant::now(),
                });
                return Err(e.into());
            }
        };

        self.telemetry.record(GatewayEvent::CommandStarted {
            request_id,
            argv: validated.argv(),
            timestamp: Instant::now(),
        });

        let outcome =
            runner::run_command(&validated, &self.context.working_dir, self.context.timeout).await;

        match &outcome {
            Ok(result) => self.telemetry.record(GatewayEvent::CommandCompleted {
                request_id,
                exit_code: result.exit_code,
                duration_ms: result.duration_ms,
                timestamp: Instant::now(),
            }),
            Err(GatewayError::CommandTimeout { seconds }) => {
                self.telemetry.record(GatewayEvent::CommandTimedOut {
                    request_id,
                    timeout_secs: *seconds,
                    timestamp: Instant::now(),
                })
            }
            Err(e) => self.telemetry.record(GatewayEvent::ExecutionFailed {
                request_id,
                reason: e.to_string(),
                timestamp: Instant::now(),
            }),
        }

        outcome
    }

    /// Tool-call boundary for `run_command`
    ///
    /// Never fails: every error becomes a single error segment.
    pub async fn call_run_command(&self, arguments: Option<&serde_json::Value>) -> ToolResponse {
        let command = match arguments.and_then(|args| args.get("command")) {
            None | Some(serde_json::Value::Null) => {
                return ToolResponse::failure("No command provided")
            }
            Some(value) => match value.as_str() {
                Some(command) => command,
                None => return ToolResponse::failure("Error: 'command' must be a string"),
            },
        };

        match self.execute(command).await {
            Ok(result) => ToolResponse::from_execution(&result),
            Err(e) => ToolResponse::failure(Self::describe_failure(&e)),
        }
    }

    /// User-visible text for a failed request
    pub fn describe_failure(error: &GatewayError) -> String {
        match error {
            GatewayError::Security(_) | GatewayError::CommandTimeout { .. } => error.to_string(),
            other => format!("Error: {}", other),
        }
    }

    /// Effective policy, for "what am I allowed to do" queries
    pub fn describe_policy(&self) -> PolicySummary {
        self.telemetry.record(GatewayEvent::PolicyQueried {
            timestamp: Instant::now(),
        });
        PolicySummary::new(&self.policy, self.guard.root().to_path_buf())
    }

    /// Formatted security rules text
    pub fn security_rules(&self) -> String {
        self.describe_policy().to_string()
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Canonical allowed root
    pub fn root(&self) -> &Path {
        self.guard.root()
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }
}
