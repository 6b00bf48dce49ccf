use super::{parse_args, schema_of, Tool, ToolContext, ToolEffect, ToolResult};
use crate::agent::executor::{ExecutionRequest, ExecutionStatus, RemediationExecutor};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Deserialize, JsonSchema)]
struct RemediateArgs {
    /// Action identifier from the approved dry-run plan.
    action: String,
    /// Exact runtime name of the target component.
    component: String,
    /// Must be exactly `YES`, as typed by the operator.
    #[serde(default)]
    confirm_token: String,
}

/// Executes an approved plan through the remediation executor.
pub struct RemediateTool {
    executor: Arc<RemediationExecutor>,
}

impl RemediateTool {
    pub fn new(executor: Arc<RemediationExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for RemediateTool {
    fn name(&self) -> &str {
        "execute_remediation_action"
    }

    fn description(&self) -> &str {
        "EXECUTES a remediation action on the cluster. This changes system state. \
         Only call it after a dry-run plan for the same action and component was shown \
         and the operator explicitly confirmed it; pass confirm_token='YES' only then."
    }

    fn parameters(&self) -> serde_json::Value {
        schema_of::<RemediateArgs>()
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext<'_>) -> ToolResult {
        let args: RemediateArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };

        if !ctx.plans.iter().any(|p| p.targets(&args.action, &args.component)) {
            warn!(
                session = %ctx.session_id,
                action = %args.action,
                component = %args.component,
                "Execution requested without a dry-run plan"
            );
            return ToolResult::failure(format!(
                "FAILURE: No dry-run plan was proposed for '{}' on '{}'. Call generate_dry_run_plan first.",
                args.action, args.component
            ));
        }

        let result = self
            .executor
            .execute(&ExecutionRequest {
                action: args.action,
                component: args.component,
                confirm_token: args.confirm_token,
            })
            .await;

        let output = ToolResult {
            success: matches!(
                result.status,
                ExecutionStatus::Success | ExecutionStatus::Simulated
            ),
            output: result.detail.clone(),
            effect: None,
        };
        output.with_effect(ToolEffect::Executed(result))
    }
}
