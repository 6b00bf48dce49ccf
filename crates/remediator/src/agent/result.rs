//! Agent Result Structures
//!
//! What one user turn produced: the answer, how the turn ended, and every
//! plan and execution result it generated.

use super::conversation::ToolCall;
use super::executor::ExecutionResult;
use super::plan::RemediationPlan;
use serde::Serialize;
use std::fmt;

/// Progress notifications emitted while a turn runs.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Decided {
        thought: String,
        calls: Vec<ToolCall>,
    },
    ToolOutput {
        call: ToolCall,
        output: String,
        success: bool,
    },
    FinalAnswer(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    Answered,
    StepLimitExceeded { limit: u32 },
    DecisionFailed { error: String },
}

impl TurnOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Answered => "answered",
            TurnOutcome::StepLimitExceeded { .. } => "step_limit_exceeded",
            TurnOutcome::DecisionFailed { .. } => "decision_failed",
        }
    }
}

impl fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnOutcome::Answered => write!(f, "answered"),
            TurnOutcome::StepLimitExceeded { limit } => {
                write!(f, "step limit of {} exceeded", limit)
            }
            TurnOutcome::DecisionFailed { error } => write!(f, "decision-maker failed: {}", error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    /// Text shown to the operator.
    pub answer: String,
    pub outcome: TurnOutcome,
    /// THINK steps taken.
    pub steps: u32,
    pub tool_calls: usize,
    pub plans: Vec<RemediationPlan>,
    pub executions: Vec<ExecutionResult>,
}

impl TurnReport {
    pub fn is_answered(&self) -> bool {
        self.outcome == TurnOutcome::Answered
    }
}
