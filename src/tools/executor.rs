//! Tool dispatcher with bounded process concurrency
//!
//! Routes named tool calls to the gateway. Calls to tools that are not
//! read-only hold a semaphore permit for the lifetime of the child, so at
//! most `max_parallel` children exist at once. Introspection is never
//! throttled.

use crate::policy::PolicySummary;
use crate::tools::gateway::Gateway;
use crate::tools::registry::{ToolRegistry, RUN_COMMAND, SHOW_SECURITY_RULES};
use crate::tools::types::{ToolResponse, ToolSchema};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default concurrency limit: one child per CPU
pub fn default_max_parallel() -> usize {
    num_cpus::get().max(1)
}

/// Dispatcher for tool calls
pub struct ToolDispatcher {
    /// Semaphore for concurrency control
    semaphore: Arc<Semaphore>,

    /// Tool registry
    registry: ToolRegistry,

    /// Gateway doing the actual work
    gateway: Arc<Gateway>,

    max_parallel: usize,
}

impl ToolDispatcher {
    /// Create new dispatcher
    pub fn new(gateway: Arc<Gateway>, max_parallel: usize) -> Self {
        let max_parallel = max_parallel.max(1);
        let summary = PolicySummary::new(gateway.policy(), gateway.root().to_path_buf());
        let registry = ToolRegistry::new(&summary);

        Self {
            semaphore: Arc::new(Semaphore::new(max_parallel)),
            registry,
            gateway,
            max_parallel,
        }
    }

    /// Schemas of all exposed tools
    pub fn list_tools(&self) -> Vec<ToolSchema> {
        self.registry.schemas().into_iter().cloned().collect()
    }

    /// Dispatch a tool call by name
    ///
    /// Unknown tools produce an error response rather than an error value.
    pub async fn call_tool(&self, name: &str, arguments: Option<&serde_json::Value>) -> ToolResponse {
        let schema = match self.registry.get(name) {
            Some(schema) => schema,
            None => return ToolResponse::failure(format!("Unknown tool: {}", name)),
        };

        let _permit = if schema.read_only {
            None
        } else {
            match self.semaphore.acquire().await {
                Ok(permit) => Some(permit),
                Err(_) => return ToolResponse::failure("Error: dispatcher is shutting down"),
            }
        };

        match name {
            RUN_COMMAND => self.gateway.call_run_command(arguments).await,
            SHOW_SECURITY_RULES => ToolResponse::message(self.gateway.security_rules()),
            _ => ToolResponse::failure(format!("Unknown tool: {}", name)),
        }
    }

    /// Get registry reference
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Get current parallelism limit
    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }
}
