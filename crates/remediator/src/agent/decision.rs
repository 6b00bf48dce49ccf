//! The decision-maker capability: given the conversation so far, pick the next
//! tool calls or give a final answer.

use super::conversation::{ConversationState, ToolCall};
use super::tools::ToolSpec;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Run these calls in order, then ask again.
    CallTools { thought: String, calls: Vec<ToolCall> },
    FinalAnswer(String),
}

impl Decision {
    pub fn call(name: &str, arguments: serde_json::Value) -> Self {
        Decision::CallTools {
            thought: String::new(),
            calls: vec![ToolCall::new(name, arguments)],
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Decision::FinalAnswer(text.into())
    }
}

#[async_trait]
pub trait DecisionMaker: Send + Sync {
    async fn decide(
        &self,
        system_prompt: &str,
        state: &ConversationState,
        tools: &[ToolSpec],
    ) -> Result<Decision>;
}

/// Scripted decision-maker for tests and offline runs.
///
/// Replays queued decisions in order. Once the script runs out it keeps
/// returning the fallback, or a fixed final answer when none is set.
pub struct MockDecisionMaker {
    script: Mutex<VecDeque<std::result::Result<Decision, String>>>,
    fallback: Option<Decision>,
    calls: Mutex<Vec<usize>>,
}

impl MockDecisionMaker {
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            script: Mutex::new(decisions.into_iter().map(Ok).collect()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Keep returning `decision` after the script is exhausted.
    pub fn repeating(mut self, decision: Decision) -> Self {
        self.fallback = Some(decision);
        self
    }

    /// Queue a provider failure as the next step.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(message.into()));
        self
    }

    /// Conversation length observed at each call.
    pub fn observed_lengths(&self) -> Vec<usize> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl DecisionMaker for MockDecisionMaker {
    async fn decide(
        &self,
        _system_prompt: &str,
        state: &ConversationState,
        _tools: &[ToolSpec],
    ) -> Result<Decision> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(state.len());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            Some(Ok(decision)) => Ok(decision),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(match &self.fallback {
                Some(decision) => match decision {
                    // Fresh ids so every repeated call is distinct.
                    Decision::CallTools { thought, calls } => Decision::CallTools {
                        thought: thought.clone(),
                        calls: calls
                            .iter()
                            .map(|c| ToolCall::new(c.name.clone(), c.arguments.clone()))
                            .collect(),
                    },
                    other => other.clone(),
                },
                None => Decision::answer("No further steps."),
            }),
        }
    }
}
