use super::{KnowledgeBase, RunbookEntry};

/// Lower-case and drop `_`, `-` and spaces so that `KafkaBrokerDown`,
/// `kafka_broker_down` and `Kafka Broker-Down` compare equal.
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Match a free-text keyword or alert name against every runbook entry.
///
/// An entry matches when the normalized keyword equals or is contained in its
/// key, is contained in its symptom, or contains the key. Results follow the
/// knowledge base's key order. A keyword that normalizes to nothing matches
/// nothing.
pub fn resolve<'a>(keyword: &str, kb: &'a KnowledgeBase) -> Vec<&'a RunbookEntry> {
    let needle = normalize(keyword);
    if needle.is_empty() {
        return Vec::new();
    }

    kb.iter()
        .filter(|entry| {
            let key = normalize(&entry.key);
            let symptom = normalize(&entry.symptom);
            needle == key
                || key.contains(&needle)
                || symptom.contains(&needle)
                || needle.contains(&key)
        })
        .collect()
}

/// Render matches as the observation text handed back to the decision-maker.
pub fn render_matches(keyword: &str, matches: &[&RunbookEntry]) -> String {
    if matches.is_empty() {
        return format!(
            "No runbook entries found for keyword '{}'. Please analyze based on general SRE principles.",
            keyword
        );
    }

    matches
        .iter()
        .map(|entry| render_entry(entry))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_entry(entry: &RunbookEntry) -> String {
    let mut out = format!("=== SCENARIO: {} ===\n", entry.key);
    out.push_str(&format!("Symptom: {}\n", entry.symptom));
    if let Some(component) = &entry.component {
        out.push_str(&format!("Component: {}\n", component));
    }
    out.push_str("Diagnosis Steps:\n");
    for (i, step) in entry.diagnosis_steps.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, step));
    }
    out.push_str(&format!(
        "Allowed Actions: {}\n",
        entry.remediation_actions.join(", ")
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb() -> KnowledgeBase {
        KnowledgeBase::from_yaml_str(
            r#"
kafka_broker_down:
  symptom: "Kafka broker is unreachable."
  component: kafka
  diagnosis_steps: ["Check the broker container."]
  remediation_actions: [restart_container]
KafkaConsumerLagHigh:
  symptom: "Consumer group lag keeps growing."
  diagnosis_steps: ["Query kafka_consumergroup_lag."]
  remediation_actions: [restart_consumer, scale_up_consumer]
NodeCPUHigh:
  symptom: "Host CPU is saturated."
  diagnosis_steps: ["Query node CPU."]
  remediation_actions: [restart_container, scale_up]
"#,
        )
        .unwrap()
    }

    fn keys(matches: &[&RunbookEntry]) -> Vec<String> {
        matches.iter().map(|e| e.key.clone()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Kafka_Broker-Down"), normalize("kafkabrokerdown"));
        assert_eq!(normalize("Kafka Broker Down"), "kafkabrokerdown");

        for s in ["Kafka_Broker-Down", "  spark  master ", "ÄBC-d", ""] {
            assert_eq!(normalize(&normalize(s)), normalize(s));
        }
    }

    #[test]
    fn test_alert_name_matches_snake_case_key() {
        let kb = kb();
        assert_eq!(keys(&resolve("KafkaBrokerDown", &kb)), vec!["kafka_broker_down"]);
    }

    #[test]
    fn test_broad_keyword_matches_many() {
        let kb = kb();
        assert_eq!(
            keys(&resolve("kafka", &kb)),
            vec!["KafkaConsumerLagHigh", "kafka_broker_down"]
        );
        // symptom match
        assert_eq!(keys(&resolve("saturated", &kb)), vec!["NodeCPUHigh"]);
        // key contained in keyword
        assert_eq!(
            keys(&resolve("firing: NodeCPUHigh on host-1", &kb)),
            vec!["NodeCPUHigh"]
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let kb = kb();
        let first = keys(&resolve("high", &kb));
        for _ in 0..5 {
            assert_eq!(keys(&resolve("high", &kb)), first);
        }
    }

    #[test]
    fn test_no_match_and_blank_keyword() {
        let kb = kb();
        assert!(resolve("zookeeper", &kb).is_empty());
        assert!(resolve(" _- ", &kb).is_empty());

        let text = render_matches("zookeeper", &[]);
        assert!(text.starts_with("No runbook entries found for keyword 'zookeeper'"));
    }

    #[test]
    fn test_render_matches() {
        let kb = kb();
        let text = render_matches("KafkaBrokerDown", &resolve("KafkaBrokerDown", &kb));
        assert!(text.contains("=== SCENARIO: kafka_broker_down ==="));
        assert!(text.contains("Component: kafka"));
        assert!(text.contains("  1. Check the broker container."));
        assert!(text.contains("Allowed Actions: restart_container"));
    }
}
