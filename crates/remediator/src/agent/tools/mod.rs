//! Agent Tools Module
//!
//! The named operations the decision-maker can call. Every tool turns its
//! outcome into observation text; nothing here returns an error to the loop.

pub mod alerts;
pub mod dry_run;
pub mod promql;
pub mod remediate;
pub mod runbook;

pub use alerts::ListAlertsTool;
pub use dry_run::DryRunTool;
pub use promql::PromQLTool;
pub use remediate::RemediateTool;
pub use runbook::RunbookTool;

use super::conversation::ToolCall;
use super::executor::{ExecutionResult, RemediationExecutor};
use super::plan::RemediationPlan;
use crate::gateway::DiagnosticGateway;
use crate::knowledge::KnowledgeBase;
use crate::metrics;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Side effects on conversation state the loop must apply after a call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEffect {
    PlanProposed(RemediationPlan),
    Executed(ExecutionResult),
}

/// Result from tool execution
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub effect: Option<ToolEffect>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            effect: None,
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            effect: None,
        }
    }

    pub fn with_effect(mut self, effect: ToolEffect) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// Read-only view of the calling session.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub session_id: &'a str,
    /// Dry-run plans proposed earlier in this session.
    pub plans: &'a [RemediationPlan],
}

/// Name, description and JSON schema as advertised to the decision-maker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Common trait for all agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Description for the decision-maker.
    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> serde_json::Value;

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext<'_>) -> ToolResult;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

pub(crate) fn schema_of<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// Decode tool arguments; `null` counts as an empty object.
pub(crate) fn parse_args<T: DeserializeOwned>(
    tool: &str,
    args: serde_json::Value,
) -> Result<T, ToolResult> {
    let args = if args.is_null() {
        serde_json::json!({})
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| {
        ToolResult::failure(format!(
            "FAILURE: Invalid arguments for tool '{}': {}",
            tool, e
        ))
    })
}

/// The fixed set of tools offered in every session.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn standard(
        gateway: Arc<DiagnosticGateway>,
        kb: Arc<KnowledgeBase>,
        executor: Arc<RemediationExecutor>,
    ) -> Self {
        Self::new()
            .with_tool(ListAlertsTool::new(gateway.clone()))
            .with_tool(PromQLTool::new(gateway))
            .with_tool(RunbookTool::new(kb))
            .with_tool(DryRunTool::new(executor.catalog()))
            .with_tool(RemediateTool::new(executor))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Run one call. Unknown tools come back as a FAILURE observation.
    pub async fn invoke(&self, call: &ToolCall, ctx: &ToolContext<'_>) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool = %call.name, session = %ctx.session_id, "Decision-maker requested an unknown tool");
            return ToolResult::failure(format!(
                "FAILURE: Unknown tool '{}'. Available tools: {}.",
                call.name,
                self.names().join(", ")
            ));
        };

        metrics::record_tool_invocation(tool.name());
        debug!(tool = %call.name, session = %ctx.session_id, args = %call.arguments, "Invoking tool");
        tool.execute(call.arguments.clone(), ctx).await
    }
}
