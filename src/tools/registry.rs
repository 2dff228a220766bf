//! Tool registry with JSON schemas
//!
//! Describes the tools exposed to the calling agent. Descriptions embed the
//! active policy so the agent sees what it may run before trying.
//!
//! Tools:
//! - run_command: Execute a single command inside the allowed directory
//! - show_security_rules: Show the active security configuration

use crate::policy::PolicySummary;
use crate::tools::types::ToolSchema;
use serde_json::json;
use std::collections::BTreeMap;

/// Tool name for command execution
pub const RUN_COMMAND: &str = "run_command";

/// Tool name for policy introspection
pub const SHOW_SECURITY_RULES: &str = "show_security_rules";

/// Tool registry
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    /// Map of tool name to schema
    tools: BTreeMap<String, ToolSchema>,
}

impl ToolRegistry {
    /// Create registry describing the given policy
    pub fn new(summary: &PolicySummary) -> Self {
        let mut registry = Self {
            tools: BTreeMap::new(),
        };

        registry.register_run_command(summary);
        registry.register_show_security_rules();

        registry
    }

    /// Register run_command tool
    fn register_run_command(&mut self, summary: &PolicySummary) {
        let description = format!(
            "Allows command (CLI) execution in the directory: {}\n\n\
             Available commands: {}\n\
             Available flags: {}\n\n\
             Note: Shell operators (&&, |, >, >>) are not supported.",
            summary.working_directory.display(),
            summary.allowed_commands.describe("all commands"),
            summary.allowed_flags.describe("all flags"),
        );

        let schema = ToolSchema::new(
            RUN_COMMAND,
            description,
            json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Single command to execute (example: 'ls -l' or 'cat file.txt')"
                    }
                },
                "required": ["command"]
            }),
            false, // May have side effects
        );
        self.tools.insert(RUN_COMMAND.to_string(), schema);
    }

    /// Register show_security_rules tool
    fn register_show_security_rules(&mut self) {
        let schema = ToolSchema::new(
            SHOW_SECURITY_RULES,
            "Show what commands and operations are allowed in this environment.\n",
            json!({
                "type": "object",
                "properties": {}
            }),
            true, // Read-only
        );
        self.tools.insert(SHOW_SECURITY_RULES.to_string(), schema);
    }

    /// Get tool schema by name
    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name)
    }

    /// Get all tool schemas, ordered by name
    pub fn schemas(&self) -> Vec<&ToolSchema> {
        self.tools.values().collect()
    }
}
