use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec_with_registry, Encoder, IntCounterVec, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref TOOL_INVOCATIONS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "sre_tool_invocations_total",
        "Total number of tool invocations made by the agent loop.",
        &["tool"],
        REGISTRY
    )
    .unwrap();
    pub static ref REMEDIATION_RESULTS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "sre_remediation_results_total",
        "Remediation execution outcomes by status.",
        &["status"],
        REGISTRY
    )
    .unwrap();
    pub static ref TURNS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "sre_turns_total",
        "Completed user turns by outcome.",
        &["outcome"],
        REGISTRY
    )
    .unwrap();
    pub static ref PROXY_AUTH_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "sre_proxy_auth_failures_total",
        "Requests rejected by the monitoring proxy for a bad or missing token.",
        &["endpoint"],
        REGISTRY
    )
    .unwrap();
}

pub fn record_tool_invocation(tool: &str) {
    TOOL_INVOCATIONS_TOTAL.with_label_values(&[tool]).inc();
}

pub fn record_remediation(status: &str) {
    REMEDIATION_RESULTS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_turn(outcome: &str) {
    TURNS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_auth_failure(endpoint: &str) {
    PROXY_AUTH_FAILURES_TOTAL.with_label_values(&[endpoint]).inc();
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> crate::Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::Error::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::Error::Internal(format!("Metrics are not valid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_exposition() {
        record_tool_invocation("consult_runbook");
        record_remediation("SUCCESS");

        let text = gather_metrics().unwrap();
        assert!(text.contains("sre_tool_invocations_total"));
        assert!(text.contains("tool=\"consult_runbook\""));
        assert!(text.contains("sre_remediation_results_total"));
    }
}
