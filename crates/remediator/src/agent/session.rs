//! Session isolation: each session id owns one conversation; turns on the
//! same session queue behind each other, distinct sessions run in parallel.

use super::conversation::{ConversationEntry, ConversationState};
use super::decision::DecisionMaker;
use super::executor::RemediationExecutor;
use super::provider::create_decision_maker;
use super::result::{TurnEvent, TurnReport};
use super::runtime::AgentRuntime;
use super::safety::ActionCatalog;
use super::templates::render_system_prompt;
use super::tools::ToolSet;
use crate::config::Config;
use crate::gateway::DiagnosticGateway;
use crate::knowledge::KnowledgeBase;
use crate::runtime::{ContainerRuntime, KubeRuntime, Unavailable};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

/// Sessions live until they are reset.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<AsyncMutex<ConversationState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the conversation for `session_id`.
    pub fn session(&self, session_id: &str) -> Arc<AsyncMutex<ConversationState>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(ConversationState::new())))
            .clone()
    }

    pub fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Orchestrator {
    runtime: Arc<AgentRuntime>,
    sessions: SessionStore,
}

impl Orchestrator {
    pub fn new(runtime: Arc<AgentRuntime>) -> Self {
        Self {
            runtime,
            sessions: SessionStore::new(),
        }
    }

    /// Wire the full agent from configuration. A knowledge base that fails to
    /// load is fatal; an unreachable container runtime is not.
    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        let kb = Arc::new(KnowledgeBase::load(&config.knowledge.runbook_path)?);
        let catalog = Arc::new(ActionCatalog::from_knowledge(&kb));
        let gateway = Arc::new(DiagnosticGateway::new(&config.monitor)?);

        let container_runtime: Arc<dyn ContainerRuntime> =
            match KubeRuntime::infer(config.runtime.namespace.clone(), config.runtime.timeout()).await {
                Ok(runtime) => Arc::new(runtime),
                Err(e) => {
                    warn!(error = %e, "No container runtime available; restarts will fail");
                    Arc::new(Unavailable {
                        reason: e.to_string(),
                    })
                }
            };
        info!(runtime = %container_runtime.describe(), actions = catalog.len(), "Remediation executor ready");

        let executor = Arc::new(RemediationExecutor::new(container_runtime, catalog));
        let tools = ToolSet::standard(gateway, kb, executor);

        let decision_maker =
            create_decision_maker(&config.agent).map_err(|e| crate::Error::Agent(e.to_string()))?;

        Self::assemble(config, decision_maker, tools)
    }

    /// Build around an explicit decision-maker and tool set.
    pub fn assemble(
        config: &Config,
        decision_maker: Arc<dyn DecisionMaker>,
        tools: ToolSet,
    ) -> crate::Result<Self> {
        let system_prompt =
            render_system_prompt(&config.agent.components, &tools.specs(), config.agent.max_steps)?;
        let runtime = AgentRuntime::new(decision_maker, tools, system_prompt, config.agent.max_steps);
        Ok(Self::new(Arc::new(runtime)))
    }

    pub fn runtime(&self) -> &AgentRuntime {
        &self.runtime
    }

    pub async fn handle(&self, session_id: &str, input: &str) -> TurnReport {
        self.handle_observed(session_id, input, &mut |_: &TurnEvent| {}).await
    }

    pub async fn handle_observed(
        &self,
        session_id: &str,
        input: &str,
        observer: &mut (dyn FnMut(&TurnEvent) + Send),
    ) -> TurnReport {
        let session = self.sessions.session(session_id);
        let mut state = session.lock().await;
        self.runtime
            .run_turn_observed(session_id, &mut state, input, observer)
            .await
    }

    /// Clear a session's history and plans and drop it from the store.
    pub async fn reset(&self, session_id: &str) {
        let session = self.sessions.session(session_id);
        // Waits for a running turn; later handles start from a fresh state.
        session.lock().await.clear();
        self.sessions.remove(session_id);
        info!(session = %session_id, "Session reset");
    }

    pub async fn history(&self, session_id: &str) -> Vec<ConversationEntry> {
        let session = self.sessions.session(session_id);
        let state = session.lock().await;
        state.entries().to_vec()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::decision::{Decision, MockDecisionMaker};

    fn orchestrator(decisions: MockDecisionMaker) -> Orchestrator {
        Orchestrator::assemble(&Config::default(), Arc::new(decisions), ToolSet::new()).unwrap()
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let orchestrator = orchestrator(MockDecisionMaker::new([
            Decision::answer("one"),
            Decision::answer("two"),
            Decision::answer("three"),
        ]));

        orchestrator.handle("alice", "first").await;
        orchestrator.handle("bob", "second").await;
        orchestrator.handle("alice", "third").await;

        assert_eq!(orchestrator.history("alice").await.len(), 4);
        assert_eq!(orchestrator.history("bob").await.len(), 2);
        assert_eq!(orchestrator.sessions().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let orchestrator = orchestrator(MockDecisionMaker::new([]));
        orchestrator.handle("s", "hello").await;
        orchestrator.handle("other", "hello").await;
        orchestrator.reset("s").await;

        assert_eq!(orchestrator.sessions().len(), 1);
        assert!(orchestrator.history("s").await.is_empty());
        assert_eq!(orchestrator.history("other").await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_distinct_sessions() {
        let orchestrator = Arc::new(orchestrator(MockDecisionMaker::new([])));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { orchestrator.handle(&format!("s{}", i), "ping").await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_answered());
        }
        for i in 0..4 {
            assert_eq!(orchestrator.history(&format!("s{}", i)).await.len(), 2);
        }
    }
}
