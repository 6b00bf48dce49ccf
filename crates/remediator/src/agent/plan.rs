use super::safety::{ActionCatalog, ActionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    PendingApproval,
}

/// A proposed, not yet executed, remediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub action: String,
    pub reason: String,
    pub component: String,
    /// `None` when the action is not in the whitelist.
    pub kind: Option<ActionKind>,
    pub status: PlanStatus,
}

impl RemediationPlan {
    pub fn new(
        action: impl Into<String>,
        reason: impl Into<String>,
        component: impl Into<String>,
        catalog: &ActionCatalog,
    ) -> Self {
        let action = action.into();
        let kind = catalog.kind(&action);
        Self {
            action,
            reason: reason.into(),
            component: component.into(),
            kind,
            status: PlanStatus::PendingApproval,
        }
    }

    pub fn targets(&self, action: &str, component: &str) -> bool {
        self.action == action && self.component == component
    }

    /// Render the report. Only `at` varies between calls with the same plan.
    pub fn render(&self, at: DateTime<Utc>) -> String {
        let class = match self.kind {
            Some(kind) => format!("{} (risk: {})", kind, kind.risk()),
            None => "NOT WHITELISTED - execution will be refused".to_string(),
        };
        let outcome = match self.kind {
            Some(ActionKind::RestartContainer) => {
                "Component restarted; related alerts expected to resolve."
            }
            Some(ActionKind::ScaleCapacity) => "Scaling request logged; no capacity change is applied.",
            Some(ActionKind::Unclassified) => "Request logged; no runtime change is applied.",
            None => "None. The action cannot be executed.",
        };

        let rule = "#".repeat(55);
        let sep = format!("# {}", "-".repeat(51));
        [
            rule.clone(),
            "#              DRY-RUN REMEDIATION PLAN".to_string(),
            "#        (proposal only - nothing has been run)".to_string(),
            rule.clone(),
            format!("# Date: {}", at.to_rfc3339()),
            format!("# Component: {}", self.component),
            format!("# Detected Symptom: {}", self.reason),
            sep.clone(),
            "# PROPOSED ACTION:".to_string(),
            format!("#   >>> {}", self.action),
            format!("# ACTION CLASS: {}", class),
            sep.clone(),
            "# EXPECTED OUTCOME:".to_string(),
            format!("#   - {}", outcome),
            sep,
            "# STATUS: PENDING HUMAN APPROVAL".to_string(),
            format!("# To approve, confirm with the token \"{}\".", super::safety::CONFIRM_TOKEN),
            rule,
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn catalog() -> ActionCatalog {
        ActionCatalog::from_actions(["restart_container", "scale_up"])
    }

    #[test]
    fn test_render_contains_inputs_verbatim() {
        let plan = RemediationPlan::new(
            "restart_container",
            "KafkaBrokerDown: broker unreachable for 2m",
            "kafka",
            &catalog(),
        );
        let report = plan.render(Utc::now());

        assert!(report.contains("DRY-RUN REMEDIATION PLAN"));
        assert!(report.contains(">>> restart_container"));
        assert!(report.contains("KafkaBrokerDown: broker unreachable for 2m"));
        assert!(report.contains("# Component: kafka"));
        assert!(report.contains("PENDING HUMAN APPROVAL"));
        assert_eq!(plan.status, PlanStatus::PendingApproval);
    }

    #[test]
    fn test_render_differs_only_in_date() {
        let plan = RemediationPlan::new("scale_up", "cpu", "spark-worker", &catalog());
        let a = plan.render(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let b = plan.render(Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap());
        assert_ne!(a, b);

        let differing: Vec<(&str, &str)> = a
            .lines()
            .zip(b.lines())
            .filter(|(x, y)| x != y)
            .collect();
        assert_eq!(differing.len(), 1);
        assert!(differing[0].0.starts_with("# Date:"));
    }

    #[test]
    fn test_unlisted_action_still_renders() {
        let plan = RemediationPlan::new("drop_topic", "lag", "kafka", &catalog());
        assert_eq!(plan.kind, None);
        assert!(plan.render(Utc::now()).contains("NOT WHITELISTED"));
    }
}
