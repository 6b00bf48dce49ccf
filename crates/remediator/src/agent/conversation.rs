use super::plan::RemediationPlan;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool entries: the call this observation answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// History of one session. Never shared between sessions.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    entries: Vec<ConversationEntry>,
    plans: Vec<RemediationPlan>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(ConversationEntry {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, tool_calls: Vec<ToolCall>) {
        self.entries.push(ConversationEntry {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        });
    }

    pub fn push_tool(&mut self, call_id: impl Into<String>, content: impl Into<String>) {
        self.entries.push(ConversationEntry {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        });
    }

    pub fn record_plan(&mut self, plan: RemediationPlan) {
        // A newer plan for the same target supersedes the old one.
        self.plans
            .retain(|p| !p.targets(&plan.action, &plan.component));
        self.plans.push(plan);
    }

    /// Remove the plan an execution acted on. Executing again needs a fresh plan.
    pub fn consume_plan(&mut self, action: &str, component: &str) -> Option<RemediationPlan> {
        let index = self.plans.iter().position(|p| p.targets(action, component))?;
        Some(self.plans.remove(index))
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn plans(&self) -> &[RemediationPlan] {
        &self.plans
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.plans.clear();
    }
}
