//! Alert model shared by the diagnostic gateway and the alert-rule store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("Invalid severity '{}': expected warning or critical", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P1" => Ok(Priority::P1),
            "P2" => Ok(Priority::P2),
            "P3" => Ok(Priority::P3),
            other => Err(format!("Invalid priority '{}': expected P1, P2 or P3", other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::P1 => write!(f, "P1"),
            Priority::P2 => write!(f, "P2"),
            Priority::P3 => write!(f, "P3"),
        }
    }
}

/// A firing alert as reported by the monitoring backend.
///
/// Identity is the alert name plus its full label set.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub name: String,
    pub severity: Option<Severity>,
    pub priority: Option<Priority>,
    pub summary: String,
    pub description: String,
    pub labels: BTreeMap<String, String>,
}

impl Alert {
    /// Build an alert from the raw `labels`/`annotations` maps of the backend payload.
    pub fn from_parts(
        labels: BTreeMap<String, String>,
        annotations: &BTreeMap<String, String>,
    ) -> Self {
        let name = labels
            .get("alertname")
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        let severity = labels.get("severity").and_then(|s| s.parse().ok());
        let priority = labels.get("priority").and_then(|p| p.parse().ok());

        Self {
            name,
            severity,
            priority,
            summary: annotations.get("summary").cloned().unwrap_or_default(),
            description: annotations.get("description").cloned().unwrap_or_default(),
            labels,
        }
    }

    /// Severity as the backend reported it, even when it is outside the known set.
    pub fn severity_label(&self) -> &str {
        self.labels
            .get("severity")
            .map(String::as_str)
            .unwrap_or("Unknown")
    }
}

impl PartialEq for Alert {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.labels == other.labels
    }
}

impl Eq for Alert {}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_alert_from_parts() {
        let annotations = labels(&[("summary", "Kafka broker down"), ("description", "No broker")]);
        let alert = Alert::from_parts(
            labels(&[("alertname", "KafkaBrokerDown"), ("severity", "critical"), ("priority", "P1")]),
            &annotations,
        );

        assert_eq!(alert.name, "KafkaBrokerDown");
        assert_eq!(alert.severity, Some(Severity::Critical));
        assert_eq!(alert.priority, Some(Priority::P1));
        assert_eq!(alert.description, "No broker");
    }

    #[test]
    fn test_unknown_severity_keeps_raw_label() {
        let alert = Alert::from_parts(
            labels(&[("alertname", "Odd"), ("severity", "page")]),
            &BTreeMap::new(),
        );
        assert_eq!(alert.severity, None);
        assert_eq!(alert.severity_label(), "page");
    }

    #[test]
    fn test_identity_is_name_and_labels() {
        let a = Alert::from_parts(labels(&[("alertname", "X"), ("job", "a")]), &BTreeMap::new());
        let mut b = a.clone();
        b.summary = "different summary".to_string();
        assert_eq!(a, b);

        let c = Alert::from_parts(labels(&[("alertname", "X"), ("job", "b")]), &BTreeMap::new());
        assert_ne!(a, c);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("P2".parse::<Priority>(), Ok(Priority::P2));
        assert!("p2".parse::<Priority>().is_err());
        assert!("info".parse::<Severity>().is_err());
    }
}
