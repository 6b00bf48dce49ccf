//! PromQL Tool for Prometheus Queries
//!
//! Runs range queries through the monitoring proxy and reports the latest
//! sample of every returned series.

use super::{parse_args, schema_of, Tool, ToolContext, ToolResult};
use crate::gateway::DiagnosticGateway;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

const MAX_QUERY_LEN: usize = 1000;

#[derive(Debug, Deserialize, JsonSchema)]
struct QueryArgs {
    /// PromQL expression, e.g. `sum(kafka_consumergroup_lag) by (topic)`.
    query: String,
}

/// PromQL tool for querying Prometheus
pub struct PromQLTool {
    gateway: Arc<DiagnosticGateway>,
}

impl PromQLTool {
    pub fn new(gateway: Arc<DiagnosticGateway>) -> Self {
        Self { gateway }
    }

    fn validate(&self, query: &str) -> Result<(), String> {
        if query.trim().is_empty() {
            return Err("Empty PromQL query".to_string());
        }

        // Basic validation - check for common injection attempts
        if query.contains(';') || query.contains("&&") || query.contains("||") {
            return Err("Invalid characters in PromQL query".to_string());
        }

        if query.len() > MAX_QUERY_LEN {
            return Err(format!("Query too long (max {} characters)", MAX_QUERY_LEN));
        }

        Ok(())
    }
}

#[async_trait]
impl Tool for PromQLTool {
    fn name(&self) -> &str {
        "query_prometheus"
    }

    fn description(&self) -> &str {
        "Query specific metrics from Prometheus to diagnose the root cause. \
         Input example: 'sum(kafka_consumergroup_lag) by (topic)' or 'up{job=\"namenode\"}'. \
         Returns the latest value of every matching series."
    }

    fn parameters(&self) -> serde_json::Value {
        schema_of::<QueryArgs>()
    }

    async fn execute(&self, args: serde_json::Value, _ctx: &ToolContext<'_>) -> ToolResult {
        let args: QueryArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };

        if let Err(e) = self.validate(&args.query) {
            return ToolResult::failure(format!("Error querying Prometheus: {}", e));
        }

        let output = self.gateway.query_metric(&args.query).await;
        if output.starts_with("Error") {
            ToolResult::failure(output)
        } else {
            ToolResult::ok(output)
        }
    }
}
