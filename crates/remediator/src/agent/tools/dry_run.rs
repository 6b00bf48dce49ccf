use super::{parse_args, schema_of, Tool, ToolContext, ToolEffect, ToolResult};
use crate::agent::plan::RemediationPlan;
use crate::agent::safety::ActionCatalog;
use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, JsonSchema)]
struct DryRunArgs {
    /// Action identifier taken from the runbook's allowed actions.
    action: String,
    /// Detected symptom that justifies the action.
    reason: String,
    /// Exact runtime name of the target component.
    affected_component: String,
}

/// Renders a non-committing remediation proposal.
pub struct DryRunTool {
    catalog: Arc<ActionCatalog>,
}

impl DryRunTool {
    pub fn new(catalog: Arc<ActionCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for DryRunTool {
    fn name(&self) -> &str {
        "generate_dry_run_plan"
    }

    fn description(&self) -> &str {
        "Generate a DRY-RUN report for a proposed remediation action. \
         This does NOT execute anything; it creates the plan the operator must approve. \
         It is required before execute_remediation_action can run."
    }

    fn parameters(&self) -> serde_json::Value {
        schema_of::<DryRunArgs>()
    }

    async fn execute(&self, args: serde_json::Value, _ctx: &ToolContext<'_>) -> ToolResult {
        let args: DryRunArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };

        let plan = RemediationPlan::new(
            args.action,
            args.reason,
            args.affected_component,
            &self.catalog,
        );
        ToolResult::ok(plan.render(Utc::now())).with_effect(ToolEffect::PlanProposed(plan))
    }
}
