//! Remediation executor: the only code path that changes external state.

use super::safety::{is_confirmed, ActionCatalog, ActionKind};
use crate::metrics;
use crate::runtime::{ContainerRuntime, RuntimeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Success,
    Failure,
    Aborted,
    Simulated,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Success => write!(f, "SUCCESS"),
            ExecutionStatus::Failure => write!(f, "FAILURE"),
            ExecutionStatus::Aborted => write!(f, "ABORTED"),
            ExecutionStatus::Simulated => write!(f, "SIMULATED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub action: String,
    pub component: String,
    pub confirm_token: String,
}

/// Terminal outcome. `detail` is the exact text relayed to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub component: String,
    pub action: String,
    pub detail: String,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionResult {
    fn new(status: ExecutionStatus, req: &ExecutionRequest, detail: String) -> Self {
        Self {
            status,
            component: req.component.clone(),
            action: req.action.clone(),
            detail,
            executed_at: Utc::now(),
        }
    }
}

pub struct RemediationExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    catalog: Arc<ActionCatalog>,
    /// One lock per component name; restarts of the same component never overlap.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl RemediationExecutor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, catalog: Arc<ActionCatalog>) -> Self {
        Self {
            runtime,
            catalog,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> Arc<ActionCatalog> {
        self.catalog.clone()
    }

    fn lock_for(&self, component: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(component.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    pub async fn execute(&self, req: &ExecutionRequest) -> ExecutionResult {
        let result = self.run(req).await;
        metrics::record_remediation(&result.status.to_string());
        info!(
            action = %req.action,
            component = %req.component,
            status = %result.status,
            "Remediation request handled"
        );
        result
    }

    async fn run(&self, req: &ExecutionRequest) -> ExecutionResult {
        use ExecutionStatus::*;

        if !is_confirmed(&req.confirm_token) {
            return ExecutionResult::new(
                Aborted,
                req,
                format!(
                    "ABORTED: Confirmation token missing or invalid. No action was taken on '{}'.",
                    req.component
                ),
            );
        }

        let Some(kind) = self.catalog.kind(&req.action) else {
            return ExecutionResult::new(
                Failure,
                req,
                format!(
                    "FAILURE: Action '{}' is not in the allowed remediation whitelist.",
                    req.action
                ),
            );
        };

        if req.component.trim().is_empty() {
            return ExecutionResult::new(
                Failure,
                req,
                "FAILURE: No target component was given.".to_string(),
            );
        }

        match kind {
            ActionKind::RestartContainer => self.restart(req).await,
            ActionKind::ScaleCapacity => ExecutionResult::new(
                Simulated,
                req,
                format!(
                    "SIMULATED: Scaling is not applied by this agent. Logged scaling request for '{}'.",
                    req.component
                ),
            ),
            ActionKind::Unclassified => ExecutionResult::new(
                Simulated,
                req,
                format!(
                    "SIMULATED: No runtime handler for action '{}'. Logged request for '{}'; nothing was changed.",
                    req.action, req.component
                ),
            ),
        }
    }

    /// Drop the component's lock entry once nobody else holds or awaits it.
    fn release(&self, component: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(component);
        }
    }

    async fn restart(&self, req: &ExecutionRequest) -> ExecutionResult {
        let lock = self.lock_for(&req.component);
        let result = {
            let _guard = lock.lock().await;
            self.restart_locked(req).await
        };
        self.release(&req.component, lock);
        result
    }

    async fn restart_locked(&self, req: &ExecutionRequest) -> ExecutionResult {
        match self.runtime.restart(&req.component).await {
            Ok(()) => {
                let at = Utc::now();
                let mut result = ExecutionResult::new(
                    ExecutionStatus::Success,
                    req,
                    format!(
                        "SUCCESS: Container '{}' has been restarted at {}.",
                        req.component,
                        at.to_rfc3339()
                    ),
                );
                result.executed_at = at;
                result
            }
            Err(RuntimeError::NotFound(_)) => ExecutionResult::new(
                ExecutionStatus::Failure,
                req,
                format!(
                    "FAILURE: Container '{}' not found. Cannot restart.",
                    req.component
                ),
            ),
            Err(e) => {
                warn!(component = %req.component, runtime = %self.runtime.describe(), error = %e, "Runtime call failed");
                ExecutionResult::new(
                    ExecutionStatus::Failure,
                    req,
                    format!(
                        "FAILURE: CRITICAL ERROR: Failed to execute runtime command. {}",
                        e
                    ),
                )
            }
        }
    }
}
