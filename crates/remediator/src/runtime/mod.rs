//! The managed container runtime that remediation actions are applied to.

mod kubernetes;

pub use kubernetes::KubeRuntime;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("component '{0}' not found")]
    NotFound(String),
    #[error("{0}")]
    Api(String),
    #[error("runtime call timed out after {0}s")]
    Timeout(u64),
}

/// Control API of the managed runtime.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Restart the object named `component`. Always re-issues the restart.
    async fn restart(&self, component: &str) -> Result<(), RuntimeError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// Stand-in used when no runtime could be configured; every call fails.
#[derive(Debug, Clone)]
pub struct Unavailable {
    pub reason: String,
}

#[async_trait]
impl ContainerRuntime for Unavailable {
    async fn restart(&self, _component: &str) -> Result<(), RuntimeError> {
        Err(RuntimeError::Api(format!(
            "container runtime is unavailable: {}",
            self.reason
        )))
    }

    fn describe(&self) -> String {
        "unavailable".to_string()
    }
}
