//! SRE Agent Module
//!
//! The reasoning loop, its tools, and the safety layer between a model's
//! decision and a restart on the cluster.

pub mod conversation;
pub mod decision;
pub mod executor;
pub mod plan;
pub mod provider;
pub mod result;
pub mod runtime;
pub mod safety;
pub mod session;
pub mod templates;
pub mod tools;

pub use conversation::{ConversationEntry, ConversationState, Role, ToolCall};
pub use decision::{Decision, DecisionMaker, MockDecisionMaker};
pub use executor::{ExecutionRequest, ExecutionResult, ExecutionStatus, RemediationExecutor};
pub use plan::{PlanStatus, RemediationPlan};
pub use provider::{create_decision_maker, RigDecisionMaker};
pub use result::{TurnEvent, TurnOutcome, TurnReport};
pub use runtime::AgentRuntime;
pub use safety::{ActionCatalog, ActionKind, RiskLevel, CONFIRM_TOKEN};
pub use session::{Orchestrator, SessionStore};
pub use tools::{Tool, ToolContext, ToolEffect, ToolResult, ToolSet, ToolSpec};
