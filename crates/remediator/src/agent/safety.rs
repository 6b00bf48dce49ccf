//! Safety Module for Remediation Actions
//!
//! Holds the confirmation token check and the action whitelist the executor
//! enforces before anything touches the managed runtime.

use crate::knowledge::KnowledgeBase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The single literal an operator must supply to authorize a state change.
pub const CONFIRM_TOKEN: &str = "YES";

/// Byte-for-byte comparison; no trimming, no case folding.
pub fn is_confirmed(token: &str) -> bool {
    token == CONFIRM_TOKEN
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RestartContainer,
    ScaleCapacity,
    Unclassified,
}

impl ActionKind {
    /// Classify by the leading verb token: `restart_consumer` restarts,
    /// `scale_up_spark` scales, `clear_cache` is neither.
    pub fn classify(action: &str) -> Self {
        let verb = action
            .split(|c: char| matches!(c, '_' | '-' | ' '))
            .find(|t| !t.is_empty())
            .unwrap_or_default()
            .to_lowercase();

        match verb.as_str() {
            "restart" => ActionKind::RestartContainer,
            "scale" => ActionKind::ScaleCapacity,
            _ => ActionKind::Unclassified,
        }
    }

    pub fn risk(&self) -> RiskLevel {
        match self {
            ActionKind::RestartContainer => RiskLevel::High,
            ActionKind::ScaleCapacity => RiskLevel::Medium,
            ActionKind::Unclassified => RiskLevel::Low,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::RestartContainer => write!(f, "container restart"),
            ActionKind::ScaleCapacity => write!(f, "capacity scaling (simulated)"),
            ActionKind::Unclassified => write!(f, "unclassified (logged only)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Whitelisted actions with their kind fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    actions: BTreeMap<String, ActionKind>,
}

impl ActionCatalog {
    pub fn from_actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let actions = actions
            .into_iter()
            .map(Into::into)
            .map(|a: String| {
                let kind = ActionKind::classify(&a);
                (a, kind)
            })
            .collect();
        Self { actions }
    }

    /// Whitelist is the union of every runbook entry's allowed actions.
    pub fn from_knowledge(kb: &KnowledgeBase) -> Self {
        Self::from_actions(kb.all_actions())
    }

    /// `None` when the action is not whitelisted.
    pub fn kind(&self, action: &str) -> Option<ActionKind> {
        self.actions.get(action).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ActionKind)> {
        self.actions.iter().map(|(a, k)| (a.as_str(), *k))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_is_exact() {
        assert!(is_confirmed("YES"));
        for token in ["", "yes", "Yes", " YES", "YES ", "Y", "NO", "YESS"] {
            assert!(!is_confirmed(token), "token {:?} must not confirm", token);
        }
    }

    #[test]
    fn test_classify_by_leading_verb() {
        assert_eq!(ActionKind::classify("restart_container"), ActionKind::RestartContainer);
        assert_eq!(ActionKind::classify("restart_consumer"), ActionKind::RestartContainer);
        assert_eq!(ActionKind::classify("scale_up_spark"), ActionKind::ScaleCapacity);
        assert_eq!(ActionKind::classify("clear_cache"), ActionKind::Unclassified);
        assert_eq!(ActionKind::classify("restart_and_scale"), ActionKind::RestartContainer);
        // substring elsewhere is not enough
        assert_eq!(ActionKind::classify("force_restart"), ActionKind::Unclassified);
        assert_eq!(ActionKind::classify(""), ActionKind::Unclassified);
    }

    #[test]
    fn test_catalog_whitelist() {
        let catalog = ActionCatalog::from_actions(["restart_container", "scale_up", "clear_logs"]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.kind("scale_up"), Some(ActionKind::ScaleCapacity));
        assert_eq!(catalog.kind("clear_logs"), Some(ActionKind::Unclassified));
        assert_eq!(catalog.kind("drop_database"), None);
        assert_eq!(catalog.kind("restart_everything"), None);
    }
}
