//! LLM Provider Adapter
//!
//! Drives a Rig completion model as the decision-maker: the conversation is
//! replayed as provider messages with the tool definitions attached, and the
//! model's tool calls come back as a `Decision`.

use super::conversation::{ConversationState, Role, ToolCall};
use super::decision::{Decision, DecisionMaker};
use super::tools::ToolSpec;
use crate::config::{AgentConfig, LLMProviderKind};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rig::completion::{CompletionModel, Message, ToolDefinition};
use rig::message::{AssistantContent, ToolResultContent, UserContent};
use rig::providers::{anthropic, openai};
use rig::OneOrMany;
use std::sync::Arc;
use tracing::debug;

pub struct RigDecisionMaker<M: CompletionModel> {
    model: M,
    temperature: f64,
    max_tokens: u64,
}

impl<M: CompletionModel> RigDecisionMaker<M> {
    pub fn new(model: M, temperature: f64, max_tokens: u64) -> Self {
        Self {
            model,
            temperature,
            max_tokens,
        }
    }
}

fn to_messages(state: &ConversationState) -> Vec<Message> {
    let mut messages = Vec::with_capacity(state.len());

    for entry in state.entries() {
        match entry.role {
            Role::User => messages.push(Message::user(entry.content.clone())),
            Role::Tool => {
                let id = entry.tool_call_id.clone().unwrap_or_default();
                messages.push(Message::User {
                    content: OneOrMany::one(UserContent::tool_result(
                        id,
                        OneOrMany::one(ToolResultContent::text(entry.content.clone())),
                    )),
                });
            }
            Role::Assistant => {
                let mut content = Vec::new();
                if !entry.content.is_empty() {
                    content.push(AssistantContent::text(entry.content.clone()));
                }
                for call in &entry.tool_calls {
                    content.push(AssistantContent::tool_call(
                        call.id.clone(),
                        call.name.clone(),
                        call.arguments.clone(),
                    ));
                }
                if let Ok(content) = OneOrMany::many(content) {
                    messages.push(Message::Assistant { content });
                }
            }
        }
    }

    messages
}

fn to_definitions(tools: &[ToolSpec]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|t| ToolDefinition {
            name: t.name.clone(),
            description: t.description.clone(),
            parameters: t.parameters.clone(),
        })
        .collect()
}

#[async_trait]
impl<M> DecisionMaker for RigDecisionMaker<M>
where
    M: CompletionModel + 'static,
{
    async fn decide(
        &self,
        system_prompt: &str,
        state: &ConversationState,
        tools: &[ToolSpec],
    ) -> Result<Decision> {
        let mut history = to_messages(state);
        let prompt = history
            .pop()
            .ok_or_else(|| anyhow!("Conversation is empty; nothing to decide on"))?;

        let response = self
            .model
            .completion_request(prompt)
            .preamble(system_prompt.to_string())
            .messages(history)
            .tools(to_definitions(tools))
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .send()
            .await
            .map_err(|e| anyhow!("LLM completion failed: {:?}", e))?;

        let mut text = Vec::new();
        let mut calls = Vec::new();
        for content in response.choice.iter() {
            match content {
                AssistantContent::Text(t) => text.push(t.text.clone()),
                AssistantContent::ToolCall(call) => calls.push(ToolCall {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    arguments: call.function.arguments.clone(),
                }),
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }
        let text = text.join("\n");
        debug!(tool_calls = calls.len(), text_len = text.len(), "LLM decision");

        if calls.is_empty() {
            Ok(Decision::FinalAnswer(text))
        } else {
            Ok(Decision::CallTools {
                thought: text,
                calls,
            })
        }
    }
}

/// Create the decision-maker from configuration
pub fn create_decision_maker(config: &AgentConfig) -> Result<Arc<dyn DecisionMaker>> {
    match config.provider {
        LLMProviderKind::Anthropic => {
            let base_url = config
                .base_url
                .as_deref()
                .unwrap_or("https://api.anthropic.com");
            let client = anthropic::Client::new(
                &config.api_key,
                base_url,
                None,
                anthropic::ANTHROPIC_VERSION_LATEST,
            );
            Ok(Arc::new(RigDecisionMaker::new(
                client.completion_model(&config.model),
                config.temperature,
                config.max_tokens,
            )))
        }
        LLMProviderKind::OpenAI => {
            // OpenAI-compatible endpoints (DashScope, vLLM, ...) only differ by base URL.
            let client = match &config.base_url {
                Some(url) => openai::Client::from_url(&config.api_key, url),
                None => openai::Client::new(&config.api_key),
            };
            Ok(Arc::new(RigDecisionMaker::new(
                client.completion_model(&config.model),
                config.temperature,
                config.max_tokens,
            )))
        }
    }
}
