use super::{parse_args, schema_of, Tool, ToolContext, ToolResult};
use crate::knowledge::{render_matches, resolve, KnowledgeBase};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize, JsonSchema)]
struct RunbookArgs {
    /// Alert name, component or symptom, e.g. `KafkaBrokerDown` or `kafka`.
    keyword: String,
}

/// Searches the runbook knowledge base.
pub struct RunbookTool {
    kb: Arc<KnowledgeBase>,
}

impl RunbookTool {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }
}

#[async_trait]
impl Tool for RunbookTool {
    fn name(&self) -> &str {
        "consult_runbook"
    }

    fn description(&self) -> &str {
        "Search the internal remediation runbook for an alert name, symptom or component. \
         Use this to find the diagnosis steps and the only actions that are allowed. \
         Input example: 'KafkaBrokerDown', 'kafka', 'namenode', 'cpu'."
    }

    fn parameters(&self) -> serde_json::Value {
        schema_of::<RunbookArgs>()
    }

    async fn execute(&self, args: serde_json::Value, _ctx: &ToolContext<'_>) -> ToolResult {
        let args: RunbookArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };

        let matches = resolve(&args.keyword, &self.kb);
        debug!(keyword = %args.keyword, matches = matches.len(), "Runbook lookup");
        // An empty match set is an answer, not a failure.
        ToolResult::ok(render_matches(&args.keyword, &matches))
    }
}
