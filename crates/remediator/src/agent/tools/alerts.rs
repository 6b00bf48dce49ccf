use super::{schema_of, Tool, ToolContext, ToolResult};
use crate::gateway::DiagnosticGateway;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, JsonSchema)]
struct NoArgs {}

/// Lists alerts currently firing in the monitoring backend.
pub struct ListAlertsTool {
    gateway: Arc<DiagnosticGateway>,
}

impl ListAlertsTool {
    pub fn new(gateway: Arc<DiagnosticGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for ListAlertsTool {
    fn name(&self) -> &str {
        "list_active_alerts"
    }

    fn description(&self) -> &str {
        "Fetch currently firing alerts from the monitoring system. \
         Use this tool FIRST to see what is wrong with the cluster."
    }

    fn parameters(&self) -> serde_json::Value {
        schema_of::<NoArgs>()
    }

    async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext<'_>) -> ToolResult {
        let output = self.gateway.list_active_alerts().await;
        if output.starts_with("Error") {
            ToolResult::failure(output)
        } else {
            ToolResult::ok(output)
        }
    }
}
