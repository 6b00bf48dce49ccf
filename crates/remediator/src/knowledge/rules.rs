//! Prometheus alert-rule files and their coverage by the runbook knowledge base.

use super::{normalize, resolve, KnowledgeBase, KnowledgeError};
use crate::alert::{Priority, Severity};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Group that runtime-registered rules are appended to.
pub const DYNAMIC_GROUP: &str = "dynamic-alerts";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<AlertRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alert: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(default)]
    pub expr: String,
    #[serde(rename = "for", default, skip_serializing_if = "String::is_empty")]
    pub duration: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl AlertRule {
    pub fn is_alerting(&self) -> bool {
        self.record.is_none()
    }

    fn invalid(&self, reason: impl Into<String>) -> KnowledgeError {
        KnowledgeError::InvalidRule {
            alert: self.alert.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<(), KnowledgeError> {
        if self.alert.trim().is_empty() {
            return Err(self.invalid("missing alert name"));
        }
        if self.expr.trim().is_empty() {
            return Err(self.invalid("empty expr"));
        }
        if self.duration.trim().is_empty() {
            return Err(self.invalid("missing 'for' duration"));
        }

        let label = |name: &str| {
            self.labels
                .get(name)
                .ok_or_else(|| self.invalid(format!("missing label '{}'", name)))
        };
        label("severity")?
            .parse::<Severity>()
            .map_err(|e| self.invalid(e))?;
        label("priority")?
            .parse::<Priority>()
            .map_err(|e| self.invalid(e))?;

        for annotation in ["summary", "description"] {
            if !self.annotations.contains_key(annotation) {
                return Err(self.invalid(format!("missing annotation '{}'", annotation)));
            }
        }
        Ok(())
    }
}

impl RuleFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KnowledgeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(KnowledgeError::Missing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, KnowledgeError> {
        let file: Option<RuleFile> = serde_yaml::from_str(content)?;
        Ok(file.unwrap_or_default())
    }

    pub fn alert_rules(&self) -> impl Iterator<Item = &AlertRule> {
        self.groups
            .iter()
            .flat_map(|g| g.rules.iter())
            .filter(|r| r.is_alerting())
    }

    pub fn alert_names(&self) -> BTreeSet<&str> {
        self.alert_rules().map(|r| r.alert.as_str()).collect()
    }

    /// Check every alerting rule; recording rules are left alone.
    pub fn validate(&self) -> Result<(), KnowledgeError> {
        self.alert_rules().try_for_each(AlertRule::validate)
    }
}

/// Gaps between the alert-rule store and the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// Alert names the resolver finds no runbook entry for.
    pub missing_runbooks: Vec<String>,
    /// Runbook keys that no alert rule fires under.
    pub orphaned_runbooks: Vec<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.missing_runbooks.is_empty() && self.orphaned_runbooks.is_empty()
    }
}

pub fn coverage(rules: &RuleFile, kb: &KnowledgeBase) -> CoverageReport {
    let names = rules.alert_names();

    let missing_runbooks = names
        .iter()
        .filter(|name| resolve(name, kb).is_empty())
        .map(|name| name.to_string())
        .collect();

    let normalized: BTreeSet<String> = names.iter().map(|n| normalize(n)).collect();
    let orphaned_runbooks = kb
        .keys()
        .filter(|key| !normalized.contains(&normalize(key)))
        .map(str::to_string)
        .collect();

    CoverageReport {
        missing_runbooks,
        orphaned_runbooks,
    }
}

/// Append `rule` to the `dynamic-alerts` group of a parsed rules document,
/// creating the group (or the whole document) when absent. Other groups are
/// left untouched.
pub fn append_dynamic_rule(doc: Value, rule: &AlertRule) -> Result<Value, serde_yaml::Error> {
    let rule = serde_yaml::to_value(rule)?;

    let mut root = match doc {
        Value::Mapping(m) => m,
        _ => Mapping::new(),
    };

    let mut groups = match root.remove("groups") {
        Some(Value::Sequence(groups)) => groups,
        _ => Vec::new(),
    };

    let existing = groups
        .iter_mut()
        .find(|g| g.get("name").and_then(Value::as_str) == Some(DYNAMIC_GROUP));

    match existing {
        Some(Value::Mapping(group)) => {
            let mut rules = match group.remove("rules") {
                Some(Value::Sequence(rules)) => rules,
                _ => Vec::new(),
            };
            rules.push(rule);
            group.insert(Value::from("rules"), Value::Sequence(rules));
        }
        _ => {
            let mut group = Mapping::new();
            group.insert(Value::from("name"), Value::from(DYNAMIC_GROUP));
            group.insert(Value::from("rules"), Value::Sequence(vec![rule]));
            groups.push(Value::Mapping(group));
        }
    }

    root.insert(Value::from("groups"), Value::Sequence(groups));
    Ok(Value::Mapping(root))
}
