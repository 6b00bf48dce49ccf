use super::{error::ProxyError, ProxyState};
use crate::knowledge::rules::{append_dynamic_rule, AlertRule};
use crate::metrics;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

type ProxyResult<T> = Result<Json<T>, ProxyError>;

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ProxyError> {
    payload
        .map(|Json(t)| t)
        .map_err(|rejection| ProxyError::Malformed(rejection.body_text()))
}

fn default_step() -> String {
    "30s".to_string()
}

fn default_duration() -> String {
    "1m".to_string()
}

fn default_severity() -> String {
    "warning".to_string()
}

fn default_priority() -> String {
    "P2".to_string()
}

fn default_overwrite() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct QueryRangeRequest {
    pub query: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
    #[serde(default = "default_step")]
    pub step: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub alert_name: String,
    pub expr: String,
    #[serde(default = "default_duration")]
    pub duration: String,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

impl CreateAlertRequest {
    fn into_rule(self) -> AlertRule {
        let summary = if self.summary.is_empty() {
            self.alert_name.clone()
        } else {
            self.summary
        };
        let description = if self.description.is_empty() {
            format!("Auto-generated alert: {}", self.alert_name)
        } else {
            self.description
        };

        AlertRule {
            alert: self.alert_name,
            record: None,
            expr: self.expr,
            duration: self.duration,
            labels: BTreeMap::from([
                ("severity".to_string(), self.severity),
                ("priority".to_string(), self.priority),
            ]),
            annotations: BTreeMap::from([
                ("summary".to_string(), summary),
                ("description".to_string(), description),
            ]),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateAlertResponse {
    pub status: String,
    pub alert: String,
    pub rules_file: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncDashboardRequest {
    pub dashboard_json: Value,
    #[serde(rename = "folderUid")]
    pub folder_uid: Option<String>,
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
pub struct SyncDashboardResponse {
    pub status_code: u16,
    pub json: Option<Value>,
    pub text: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "time": now_secs() }))
}

pub async fn list_alerts(State(state): State<Arc<ProxyState>>) -> ProxyResult<Value> {
    let url = format!("{}/api/v1/alerts", state.config.prometheus_url);
    let response = state.client.get(&url).send().await?.error_for_status()?;
    Ok(Json(response.json().await?))
}

pub async fn query_range(
    State(state): State<Arc<ProxyState>>,
    payload: Result<Json<QueryRangeRequest>, JsonRejection>,
) -> ProxyResult<Value> {
    let req = body(payload)?;
    let now = now_secs();
    let start = req.start.unwrap_or(now - 15.0 * 60.0);
    let end = req.end.unwrap_or(now);

    let url = format!("{}/api/v1/query_range", state.config.prometheus_url);
    let response = state
        .client
        .get(&url)
        .query(&[
            ("query", req.query),
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("step", req.step),
        ])
        .send()
        .await?
        .error_for_status()?;
    Ok(Json(response.json().await?))
}

pub async fn create_alert(
    State(state): State<Arc<ProxyState>>,
    payload: Result<Json<CreateAlertRequest>, JsonRejection>,
) -> ProxyResult<CreateAlertResponse> {
    let rule = body(payload)?.into_rule();
    rule.validate()
        .map_err(|e| ProxyError::InvalidRule(e.to_string()))?;

    let path = &state.config.rules_file;
    {
        // Read-modify-write of the rules file must not interleave.
        let _guard = state.rules_lock.lock().await;
        let doc = match tokio::fs::read_to_string(path).await {
            Ok(text) if !text.trim().is_empty() => serde_yaml::from_str(&text)?,
            Ok(_) => YamlValue::Null,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => YamlValue::Null,
            Err(e) => return Err(e.into()),
        };
        let doc = append_dynamic_rule(doc, &rule)?;
        tokio::fs::write(path, serde_yaml::to_string(&doc)?).await?;
    }
    info!(alert = %rule.alert, rules_file = %path.display(), "Registered dynamic alert rule");

    let url = format!("{}/-/reload", state.config.prometheus_url);
    let response = state.client.post(&url).send().await?;
    let status = response.status().as_u16();
    if !matches!(status, 200 | 204) {
        let text = response.text().await.unwrap_or_default();
        return Err(ProxyError::Upstream(format!(
            "Prometheus reload failed: {}",
            text
        )));
    }

    Ok(Json(CreateAlertResponse {
        status: "ok".to_string(),
        alert: rule.alert,
        rules_file: path.display().to_string(),
    }))
}

pub async fn sync_dashboard(
    State(state): State<Arc<ProxyState>>,
    payload: Result<Json<SyncDashboardRequest>, JsonRejection>,
) -> ProxyResult<SyncDashboardResponse> {
    let req = body(payload)?;
    let url = format!("{}/api/dashboards/db", state.config.grafana_url);
    let response = state
        .client
        .post(&url)
        .basic_auth(&state.config.grafana_user, Some(&state.config.grafana_pass))
        .json(&json!({
            "dashboard": req.dashboard_json,
            "folderUid": req.folder_uid,
            "overwrite": req.overwrite,
        }))
        .send()
        .await?;

    let status = response.status().as_u16();
    let text = response.text().await?;
    if !matches!(status, 200 | 202) {
        return Err(ProxyError::Upstream(text));
    }

    Ok(Json(SyncDashboardResponse {
        status_code: status,
        json: serde_json::from_str(&text).ok(),
        text,
    }))
}

pub async fn prometheus_metrics() -> Result<String, ProxyError> {
    metrics::gather_metrics().map_err(|e| ProxyError::Internal(e.to_string()))
}
