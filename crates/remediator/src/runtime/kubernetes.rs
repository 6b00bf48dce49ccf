use super::{ContainerRuntime, RuntimeError};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use kube::{Api, Client};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Restarts components by rolling out the Deployment or StatefulSet of the
/// same name in one namespace.
#[derive(Clone)]
pub struct KubeRuntime {
    client: Client,
    namespace: String,
    timeout: Duration,
}

impl KubeRuntime {
    pub fn new(client: Client, namespace: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            timeout,
        }
    }

    /// Connect using the in-cluster config or the local kubeconfig.
    pub async fn infer(namespace: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, namespace, timeout))
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, RuntimeError>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| RuntimeError::Api(e.to_string())),
            Err(_) => Err(RuntimeError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[async_trait]
impl ContainerRuntime for KubeRuntime {
    async fn restart(&self, component: &str) -> Result<(), RuntimeError> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        if self.bounded(deployments.get_opt(component)).await?.is_some() {
            debug!(component = %component, "Restarting deployment");
            self.bounded(deployments.restart(component)).await?;
            info!(component = %component, namespace = %self.namespace, "Deployment rollout restarted");
            return Ok(());
        }

        let statefulsets: Api<StatefulSet> = Api::namespaced(self.client.clone(), &self.namespace);
        if self.bounded(statefulsets.get_opt(component)).await?.is_some() {
            debug!(component = %component, "Restarting statefulset");
            self.bounded(statefulsets.restart(component)).await?;
            info!(component = %component, namespace = %self.namespace, "StatefulSet rollout restarted");
            return Ok(());
        }

        Err(RuntimeError::NotFound(component.to_string()))
    }

    fn describe(&self) -> String {
        format!("kubernetes/{}", self.namespace)
    }
}
