//! Read-only access to the monitoring proxy.
//!
//! Both public query operations return observation text instead of an error,
//! so a dead or misconfigured backend never ends an agent turn.

use crate::alert::Alert;
use crate::config::MonitorConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

pub const TOKEN_HEADER: &str = "x-api-token";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request timed out")]
    Timeout,
    #[error("authentication failed (401). Check MCP_API_TOKEN")]
    Unauthorized,
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("{0}")]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertsData {
    #[serde(default)]
    alerts: Vec<RawAlert>,
}

#[derive(Debug, Deserialize)]
struct RawAlert {
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct MatrixData {
    #[serde(default)]
    result: Vec<MetricSeries>,
}

/// One series of a range query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSeries {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<(serde_json::Value, String)>,
}

impl MetricSeries {
    pub fn latest(&self) -> Option<&str> {
        self.values.last().map(|(_, v)| v.as_str())
    }

    /// `Metric(job=kafka, instance=a) => 1`, labels sorted, `__name__` dropped.
    pub fn summary(&self) -> Option<String> {
        let last = self.latest()?;
        let labels = self
            .metric
            .iter()
            .filter(|(k, _)| k.as_str() != "__name__")
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!("Metric({}) => {}", labels, last))
    }
}

#[derive(Debug, Serialize)]
struct QueryRangeRequest<'a> {
    query: &'a str,
    step: &'a str,
}

/// Built once per process and shared by every session.
#[derive(Debug, Clone)]
pub struct DiagnosticGateway {
    client: Client,
    base_url: String,
    api_token: String,
    step: String,
}

impl DiagnosticGateway {
    pub fn new(config: &MonitorConfig) -> crate::Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            step: config.query_step.clone(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(GatewayError::Unauthorized),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(GatewayError::Status { status, body })
            }
            _ => Ok(response),
        }
    }

    pub async fn active_alerts(&self) -> Result<Vec<Alert>, GatewayError> {
        let url = format!("{}/tools/list_alerts", self.base_url);
        debug!(url = %url, "Fetching active alerts");

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.api_token)
            .send()
            .await?;
        let envelope: Envelope<AlertsData> = Self::check(response).await?.json().await?;

        Ok(envelope
            .data
            .unwrap_or_default()
            .alerts
            .into_iter()
            .map(|raw| Alert::from_parts(raw.labels, &raw.annotations))
            .collect())
    }

    pub async fn query_range(&self, expr: &str) -> Result<Vec<MetricSeries>, GatewayError> {
        let url = format!("{}/tools/query_range", self.base_url);
        debug!(url = %url, query = %expr, "Running range query");

        let response = self
            .client
            .post(&url)
            .header(TOKEN_HEADER, &self.api_token)
            .json(&QueryRangeRequest {
                query: expr,
                step: &self.step,
            })
            .send()
            .await?;
        let envelope: Envelope<MatrixData> = Self::check(response).await?.json().await?;
        Ok(envelope.data.unwrap_or_default().result)
    }

    /// One line per firing alert, or a "healthy" sentinel.
    pub async fn list_active_alerts(&self) -> String {
        match self.active_alerts().await {
            Ok(alerts) if alerts.is_empty() => {
                "No active alerts found. The system appears healthy.".to_string()
            }
            Ok(alerts) => alerts
                .iter()
                .map(|a| {
                    format!(
                        "- [ALERT] {} (Severity: {}): {}",
                        a.name,
                        a.severity_label(),
                        a.description
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                warn!(error = %e, "Failed to list active alerts");
                format!("Error connecting to MCP Monitor: {}", e)
            }
        }
    }

    /// Latest sample per series, or a "no data" sentinel.
    pub async fn query_metric(&self, expr: &str) -> String {
        match self.query_range(expr).await {
            Ok(series) => {
                let lines: Vec<String> = series.iter().filter_map(MetricSeries::summary).collect();
                if lines.is_empty() {
                    format!("No data returned for query: {}", expr)
                } else {
                    lines.join("\n")
                }
            }
            Err(e) => {
                warn!(error = %e, query = %expr, "Range query failed");
                format!("Error querying Prometheus: {}", e)
            }
        }
    }
}
