//! System prompt for the SRE agent, rendered with Tera.

use super::tools::ToolSpec;
use crate::config::ManagedComponent;
use crate::{Error, Result};
use tera::{Context, Tera};

const SYSTEM_PROMPT: &str = r#"You are an on-call SRE agent for a big-data cluster (Kafka, HDFS, Spark, ClickHouse and its monitoring stack).
You monitor the cluster, diagnose problems and carry out approved remediations yourself through your tools.

## Managed components
Use these runtime names exactly. Never invent names such as 'kafka-1' or 'hdfs-namenode'.
| Service | Name |
|---|---|
{% for c in components %}| {{ c.service }} | {{ c.name }} |
{% endfor %}
If a runbook entry lists a component, use that value.

## Workflow
1. Diagnose with list_active_alerts and query_prometheus.
2. Call consult_runbook with the alert name (for example 'KafkaBrokerDown'). Only the actions it allows may be proposed.
3. Call generate_dry_run_plan with the action, the reason and the affected component.
4. Ask the operator: "Do you want me to execute this plan? (yes/no)"
5. If the operator answers yes, call execute_remediation_action with the same action and component and confirm_token="{{ confirm_token }}". If the answer is no, stop.
execute_remediation_action is refused unless a dry-run plan for the same action and component was generated first.

## Reporting
Quote the result of execute_remediation_action exactly as returned. Never report success for a component you did not act on.
You have at most {{ max_steps }} reasoning steps per operator message.

## Tools
{% for t in tools %}- {{ t.name }}: {{ t.description }}
{% endfor %}"#;

pub fn render_system_prompt(
    components: &[ManagedComponent],
    tools: &[ToolSpec],
    max_steps: u32,
) -> Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template("system_prompt", SYSTEM_PROMPT)
        .map_err(|e| Error::Internal(format!("Failed to parse system prompt: {}", e)))?;

    let mut context = Context::new();
    context.insert("components", components);
    context.insert("tools", tools);
    context.insert("max_steps", &max_steps);
    context.insert("confirm_token", super::safety::CONFIRM_TOKEN);

    Ok(tera.render("system_prompt", &context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_components;

    #[test]
    fn test_prompt_lists_components_and_tools() {
        let tools = vec![ToolSpec {
            name: "consult_runbook".to_string(),
            description: "Search the runbook.".to_string(),
            parameters: serde_json::json!({}),
        }];
        let prompt = render_system_prompt(&default_components(), &tools, 15).unwrap();

        assert!(prompt.contains("| Kafka Broker | kafka |"));
        assert!(prompt.contains("| HDFS NameNode | namenode |"));
        assert!(prompt.contains("- consult_runbook: Search the runbook."));
        assert!(prompt.contains("confirm_token=\"YES\""));
        assert!(prompt.contains("at most 15 reasoning steps"));
    }
}
