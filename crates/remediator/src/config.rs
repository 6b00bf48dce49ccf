use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProviderKind {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl Default for LLMProviderKind {
    fn default() -> Self {
        LLMProviderKind::OpenAI
    }
}

/// A managed component as shown to the decision-maker: a human label and the
/// exact runtime object name the executor will act on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagedComponent {
    pub service: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub agent: AgentConfig,
    pub monitor: MonitorConfig,
    pub knowledge: KnowledgeConfig,
    pub runtime: RuntimeConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub provider: LLMProviderKind,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u64,
    /// Hard bound on THINK steps per user turn.
    pub max_steps: u32,
    pub components: Vec<ManagedComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_token: String,
    pub timeout_secs: u64,
    pub query_step: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    pub runbook_path: PathBuf,
    pub alert_rules_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub namespace: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub addr: String,
    #[serde(skip_serializing)]
    pub api_token: String,
    pub prometheus_url: String,
    pub grafana_url: String,
    pub grafana_user: String,
    #[serde(skip_serializing)]
    pub grafana_pass: String,
    pub rules_file: PathBuf,
    pub upstream_timeout_secs: u64,
}

impl MonitorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RuntimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ProxyConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Parse `Service Label=container-name` pairs separated by commas.
fn parse_components(raw: &str) -> crate::Result<Vec<ManagedComponent>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (service, name) = pair.split_once('=').ok_or_else(|| {
                crate::Error::Config(format!(
                    "MANAGED_COMPONENTS entry '{}' must look like 'Service=name'",
                    pair
                ))
            })?;
            Ok(ManagedComponent {
                service: service.trim().to_string(),
                name: name.trim().to_string(),
            })
        })
        .collect()
}

pub fn default_components() -> Vec<ManagedComponent> {
    [
        ("Kafka Broker", "kafka"),
        ("Kafka Exporter", "kafka-exporter"),
        ("HDFS NameNode", "namenode"),
        ("Spark Master", "spark-master"),
        ("Spark Worker", "spark-worker"),
        ("ClickHouse Server", "clickhouse"),
        ("Prometheus", "prometheus"),
        ("Alertmanager", "alertmanager"),
        ("Grafana", "grafana"),
        ("cAdvisor", "cadvisor"),
        ("Node Exporter", "node-exporter"),
        ("MCP Monitor", "mcp-monitor"),
    ]
    .into_iter()
    .map(|(service, name)| ManagedComponent {
        service: service.to_string(),
        name: name.to_string(),
    })
    .collect()
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        let components = match std::env::var("MANAGED_COMPONENTS") {
            Ok(raw) => parse_components(&raw)?,
            Err(_) => default_components(),
        };

        let config = Config {
            agent: AgentConfig {
                provider: match env_or("LLM_PROVIDER", "openai").to_lowercase().as_str() {
                    "anthropic" | "claude" => LLMProviderKind::Anthropic,
                    _ => LLMProviderKind::OpenAI,
                },
                model: env_or("LLM_MODEL", "qwen-plus"),
                api_key: env_or("LLM_API_KEY", ""),
                base_url: std::env::var("LLM_BASE_URL").ok(),
                temperature: env_parse("LLM_TEMPERATURE", 0.0),
                max_tokens: env_parse("LLM_MAX_TOKENS", 4096),
                max_steps: env_parse("AGENT_MAX_STEPS", 15),
                components,
            },
            monitor: MonitorConfig {
                base_url: env_or("MCP_URL", "http://localhost:8000"),
                api_token: env_or("MCP_API_TOKEN", "change-me"),
                timeout_secs: env_parse("MONITOR_TIMEOUT_SECS", 5),
                query_step: env_or("QUERY_STEP", "30s"),
            },
            knowledge: KnowledgeConfig {
                runbook_path: PathBuf::from(env_or("RUNBOOK_PATH", "data/runbooks.yaml")),
                alert_rules_path: PathBuf::from(env_or("ALERT_RULES_PATH", "data/alerts.yml")),
            },
            runtime: RuntimeConfig {
                namespace: env_or("RUNTIME_NAMESPACE", "default"),
                timeout_secs: env_parse("RUNTIME_TIMEOUT_SECS", 30),
            },
            proxy: ProxyConfig {
                addr: env_or("PROXY_ADDR", "0.0.0.0:8000"),
                api_token: env_or("API_TOKEN", "change-me"),
                prometheus_url: env_or("PROMETHEUS_URL", "http://prometheus:9090"),
                grafana_url: env_or("GRAFANA_URL", "http://grafana:3000"),
                grafana_user: env_or("GRAFANA_USER", "admin"),
                grafana_pass: env_or("GRAFANA_PASS", "admin"),
                rules_file: PathBuf::from(env_or("RULES_FILE", "/rules/alerts.dynamic.yml")),
                upstream_timeout_secs: env_parse("UPSTREAM_TIMEOUT_SECS", 10),
            },
        };

        config.validate()?;

        if config.agent.api_key.is_empty() {
            tracing::warn!("LLM_API_KEY is not set. The decision-maker will likely fail to authenticate.");
        }
        if config.monitor.api_token == "change-me" || config.proxy.api_token == "change-me" {
            tracing::warn!("Monitoring proxy is using the default API token 'change-me'.");
        }

        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.agent.max_steps == 0 {
            return Err(crate::Error::Config(
                "AGENT_MAX_STEPS must be at least 1".to_string(),
            ));
        }

        for (key, value) in [
            ("MCP_URL", &self.monitor.base_url),
            ("PROMETHEUS_URL", &self.proxy.prometheus_url),
            ("GRAFANA_URL", &self.proxy.grafana_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                crate::Error::Config(format!("{} is not a valid URL ({}): {}", key, value, e))
            })?;
        }

        if self.proxy.api_token.is_empty() {
            return Err(crate::Error::Config(
                "API_TOKEN must not be empty; the monitoring proxy never runs unauthenticated"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent: AgentConfig {
                provider: LLMProviderKind::OpenAI,
                model: "qwen-plus".to_string(),
                api_key: "".to_string(),
                base_url: None,
                temperature: 0.0,
                max_tokens: 4096,
                max_steps: 15,
                components: default_components(),
            },
            monitor: MonitorConfig {
                base_url: "http://localhost:8000".to_string(),
                api_token: "change-me".to_string(),
                timeout_secs: 5,
                query_step: "30s".to_string(),
            },
            knowledge: KnowledgeConfig {
                runbook_path: PathBuf::from("data/runbooks.yaml"),
                alert_rules_path: PathBuf::from("data/alerts.yml"),
            },
            runtime: RuntimeConfig {
                namespace: "default".to_string(),
                timeout_secs: 30,
            },
            proxy: ProxyConfig {
                addr: "0.0.0.0:8000".to_string(),
                api_token: "change-me".to_string(),
                prometheus_url: "http://prometheus:9090".to_string(),
                grafana_url: "http://grafana:3000".to_string(),
                grafana_user: "admin".to_string(),
                grafana_pass: "admin".to_string(),
                rules_file: PathBuf::from("/rules/alerts.dynamic.yml"),
                upstream_timeout_secs: 10,
            },
        }
    }
}
