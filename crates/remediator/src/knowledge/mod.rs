//! Runbook knowledge base: alert/scenario key to diagnosis steps and the
//! remediation actions an operator may approve for it.

pub mod resolver;
pub mod rules;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub use resolver::{normalize, render_matches, resolve};

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("knowledge base not found at {0}")]
    Missing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed knowledge base: {0}")]
    Malformed(#[from] serde_yaml::Error),
    #[error("knowledge base contains no entries")]
    Empty,
    #[error("knowledge base contains an entry with an empty key")]
    EmptyKey,
    #[error("entry '{key}' has an empty '{field}'")]
    EmptyField { key: String, field: &'static str },
    #[error("alert rule '{alert}' is invalid: {reason}")]
    InvalidRule { alert: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunbookEntry {
    /// Populated from the mapping key at load time.
    #[serde(skip)]
    pub key: String,
    pub symptom: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub diagnosis_steps: Vec<String>,
    pub remediation_actions: Vec<String>,
}

impl RunbookEntry {
    fn validate(&self) -> Result<(), KnowledgeError> {
        let empty = |field: &'static str| KnowledgeError::EmptyField {
            key: self.key.clone(),
            field,
        };

        if self.symptom.trim().is_empty() {
            return Err(empty("symptom"));
        }
        if self.diagnosis_steps.is_empty() || self.diagnosis_steps.iter().any(|s| s.trim().is_empty()) {
            return Err(empty("diagnosis_steps"));
        }
        if self.remediation_actions.is_empty()
            || self.remediation_actions.iter().any(|a| a.trim().is_empty())
        {
            return Err(empty("remediation_actions"));
        }
        Ok(())
    }
}

/// Immutable for the life of the process; shared read-only across sessions.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: BTreeMap<String, RunbookEntry>,
}

impl KnowledgeBase {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KnowledgeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(KnowledgeError::Missing(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let kb = Self::from_yaml_str(&content)?;
        info!(path = %path.display(), entries = kb.len(), "Loaded runbook knowledge base");
        Ok(kb)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, KnowledgeError> {
        let raw: Option<BTreeMap<String, RunbookEntry>> = serde_yaml::from_str(content)?;
        let raw = raw.unwrap_or_default();
        if raw.is_empty() {
            return Err(KnowledgeError::Empty);
        }

        let mut entries = BTreeMap::new();
        for (key, mut entry) in raw {
            if key.trim().is_empty() {
                return Err(KnowledgeError::EmptyKey);
            }
            entry.key = key.clone();
            entry.validate()?;
            debug!(key = %key, actions = ?entry.remediation_actions, "Runbook entry");
            entries.insert(key, entry);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&RunbookEntry> {
        self.entries.get(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &RunbookEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of every entry's allowed actions.
    pub fn all_actions(&self) -> BTreeSet<&str> {
        self.entries
            .values()
            .flat_map(|e| e.remediation_actions.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
KafkaBrokerDown:
  symptom: "Kafka broker is unreachable."
  component: kafka
  diagnosis_steps:
    - "Check the broker container."
  remediation_actions:
    - restart_container
NodeCPUHigh:
  symptom: "Host CPU is saturated."
  diagnosis_steps:
    - "Query node CPU."
  remediation_actions:
    - restart_container
    - scale_up
"#;

    #[test]
    fn test_from_yaml_str_sets_keys() {
        let kb = KnowledgeBase::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(kb.len(), 2);

        let entry = kb.get("KafkaBrokerDown").unwrap();
        assert_eq!(entry.key, "KafkaBrokerDown");
        assert_eq!(entry.component.as_deref(), Some("kafka"));
        assert_eq!(kb.all_actions().into_iter().collect::<Vec<_>>(), vec!["restart_container", "scale_up"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = KnowledgeBase::load("/definitely/not/here/runbooks.yaml").unwrap_err();
        assert!(matches!(err, KnowledgeError::Missing(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let kb = KnowledgeBase::load(file.path()).unwrap();
        assert!(kb.get("NodeCPUHigh").is_some());
    }

    #[test]
    fn test_malformed_and_empty_stores_rejected() {
        assert!(matches!(
            KnowledgeBase::from_yaml_str("KafkaBrokerDown: [not, a, mapping"),
            Err(KnowledgeError::Malformed(_))
        ));
        assert!(matches!(KnowledgeBase::from_yaml_str(""), Err(KnowledgeError::Empty)));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let yaml = r#"
KafkaBrokerDown:
  symptom: "Kafka broker is unreachable."
  diagnosis_steps: []
  remediation_actions: [restart_container]
"#;
        match KnowledgeBase::from_yaml_str(yaml) {
            Err(KnowledgeError::EmptyField { key, field }) => {
                assert_eq!(key, "KafkaBrokerDown");
                assert_eq!(field, "diagnosis_steps");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let yaml = r#"
"":
  symptom: "x"
  diagnosis_steps: ["y"]
  remediation_actions: [restart_container]
"#;
        assert!(matches!(KnowledgeBase::from_yaml_str(yaml), Err(KnowledgeError::EmptyKey)));
    }
}
