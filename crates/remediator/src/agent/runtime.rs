//! Agent Runtime
//!
//! The tool-invocation loop: ask the decision-maker for the next step, run
//! the chosen tools one after another, append what they returned, repeat
//! until a final answer or the step bound.

use super::conversation::ConversationState;
use super::decision::{Decision, DecisionMaker};
use super::executor::ExecutionStatus;
use super::result::{TurnEvent, TurnOutcome, TurnReport};
use super::tools::{ToolContext, ToolEffect, ToolSet};
use crate::metrics;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Agent runtime for executing operator turns
pub struct AgentRuntime {
    decision_maker: Arc<dyn DecisionMaker>,
    tools: ToolSet,
    system_prompt: String,
    max_steps: u32,
}

impl AgentRuntime {
    pub fn new(
        decision_maker: Arc<dyn DecisionMaker>,
        tools: ToolSet,
        system_prompt: String,
        max_steps: u32,
    ) -> Self {
        Self {
            decision_maker,
            tools,
            system_prompt,
            max_steps: max_steps.max(1),
        }
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub async fn run_turn(
        &self,
        session_id: &str,
        state: &mut ConversationState,
        input: &str,
    ) -> TurnReport {
        self.run_turn_observed(session_id, state, input, &mut |_: &TurnEvent| {})
            .await
    }

    /// Run one operator turn, reporting each step to `observer` as it happens.
    pub async fn run_turn_observed(
        &self,
        session_id: &str,
        state: &mut ConversationState,
        input: &str,
        observer: &mut (dyn FnMut(&TurnEvent) + Send),
    ) -> TurnReport {
        info!(session = %session_id, "Starting turn");
        state.push_user(input);

        let specs = self.tools.specs();
        let mut steps = 0u32;
        let mut tool_calls = 0usize;
        let mut plans = Vec::new();
        let mut executions = Vec::new();

        let (mut answer, outcome) = loop {
            if steps >= self.max_steps {
                warn!(session = %session_id, limit = self.max_steps, "Step limit reached");
                break (
                    format!(
                        "Stopped: the step limit of {} was reached before a final answer. \
                         No further actions were taken in this turn.",
                        self.max_steps
                    ),
                    TurnOutcome::StepLimitExceeded {
                        limit: self.max_steps,
                    },
                );
            }
            steps += 1;

            let decision = match self
                .decision_maker
                .decide(&self.system_prompt, state, &specs)
                .await
            {
                Ok(decision) => decision,
                Err(e) => {
                    error!(session = %session_id, error = %e, "Decision-maker failed");
                    break (
                        format!(
                            "Error: the reasoning backend failed ({}). No further actions were taken in this turn.",
                            e
                        ),
                        TurnOutcome::DecisionFailed {
                            error: e.to_string(),
                        },
                    );
                }
            };

            let (thought, calls) = match decision {
                Decision::FinalAnswer(text) => break (text, TurnOutcome::Answered),
                Decision::CallTools { thought, calls } if calls.is_empty() => {
                    break (thought, TurnOutcome::Answered)
                }
                Decision::CallTools { thought, calls } => (thought, calls),
            };

            debug!(session = %session_id, step = steps, calls = calls.len(), "Decided to call tools");
            observer(&TurnEvent::Decided {
                thought: thought.clone(),
                calls: calls.clone(),
            });
            state.push_assistant(thought, calls.clone());

            // Strictly sequential: a later call may depend on an earlier observation.
            for call in calls {
                let result = {
                    let ctx = ToolContext {
                        session_id,
                        plans: state.plans(),
                    };
                    self.tools.invoke(&call, &ctx).await
                };
                tool_calls += 1;

                match result.effect {
                    Some(ToolEffect::PlanProposed(plan)) => {
                        state.record_plan(plan.clone());
                        plans.push(plan);
                    }
                    Some(ToolEffect::Executed(execution)) => {
                        // An aborted request leaves the plan waiting for confirmation.
                        if execution.status != ExecutionStatus::Aborted {
                            state.consume_plan(&execution.action, &execution.component);
                        }
                        executions.push(execution);
                    }
                    None => {}
                }

                state.push_tool(call.id.clone(), result.output.clone());
                observer(&TurnEvent::ToolOutput {
                    call,
                    output: result.output,
                    success: result.success,
                });
            }
        };

        // Execution outcomes reach the operator verbatim, whatever the answer says.
        for execution in &executions {
            if !answer.contains(&execution.detail) {
                if !answer.is_empty() {
                    answer.push_str("\n\n");
                }
                answer.push_str(&execution.detail);
            }
        }

        state.push_assistant(answer.clone(), Vec::new());
        observer(&TurnEvent::FinalAnswer(answer.clone()));
        metrics::record_turn(outcome.label());
        info!(session = %session_id, steps, tool_calls, outcome = %outcome, "Turn finished");

        TurnReport {
            answer,
            outcome,
            steps,
            tool_calls,
            plans,
            executions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::conversation::{Role, ToolCall};
    use crate::agent::decision::MockDecisionMaker;
    use crate::agent::executor::{ExecutionStatus, RemediationExecutor};
    use crate::agent::safety::ActionCatalog;
    use crate::agent::tools::{DryRunTool, RemediateTool};
    use crate::runtime::MockContainerRuntime;
    use serde_json::json;

    fn tools(runtime: MockContainerRuntime) -> ToolSet {
        let catalog = Arc::new(ActionCatalog::from_actions(["restart_container", "scale_up"]));
        let executor = Arc::new(RemediationExecutor::new(Arc::new(runtime), catalog.clone()));
        ToolSet::new()
            .with_tool(DryRunTool::new(catalog))
            .with_tool(RemediateTool::new(executor))
    }

    fn agent(decisions: MockDecisionMaker, runtime: MockContainerRuntime, max_steps: u32) -> AgentRuntime {
        AgentRuntime::new(
            Arc::new(decisions),
            tools(runtime),
            "system".to_string(),
            max_steps,
        )
    }

    fn plan(component: &str) -> Decision {
        Decision::call(
            "generate_dry_run_plan",
            json!({"action": "restart_container", "reason": "down", "affected_component": component}),
        )
    }

    fn calls_of(decision: Decision) -> Vec<ToolCall> {
        match decision {
            Decision::CallTools { calls, .. } => calls,
            Decision::FinalAnswer(_) => Vec::new(),
        }
    }

    /// Both calls in a single decision, in the given order.
    fn together(first: Decision, second: Decision) -> Decision {
        Decision::CallTools {
            thought: String::new(),
            calls: [calls_of(first), calls_of(second)].concat(),
        }
    }

    fn execute(component: &str) -> Decision {
        Decision::call(
            "execute_remediation_action",
            json!({"action": "restart_container", "component": component, "confirm_token": "YES"}),
        )
    }

    #[tokio::test]
    async fn test_final_answer_without_tools() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().times(0);
        let agent = agent(MockDecisionMaker::new([Decision::answer("All quiet.")]), runtime, 5);

        let mut state = ConversationState::new();
        let report = agent.run_turn("s", &mut state, "status?").await;

        assert_eq!(report.outcome, TurnOutcome::Answered);
        assert_eq!(report.answer, "All quiet.");
        assert_eq!(report.steps, 1);
        assert_eq!(state.len(), 2);
    }

    #[tokio::test]
    async fn test_step_limit_ends_turn() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().times(0);
        let decisions = MockDecisionMaker::new([]).repeating(plan("kafka"));
        let agent = agent(decisions, runtime, 3);

        let mut state = ConversationState::new();
        let report = agent.run_turn("s", &mut state, "loop forever").await;

        assert_eq!(report.outcome, TurnOutcome::StepLimitExceeded { limit: 3 });
        assert_eq!(report.steps, 3);
        assert_eq!(report.tool_calls, 3);
        assert!(report.answer.contains("step limit of 3"));
    }

    #[tokio::test]
    async fn test_execution_without_plan_is_refused() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().times(0);
        let decisions = MockDecisionMaker::new([execute("kafka"), Decision::answer("done")]);
        let agent = agent(decisions, runtime, 5);

        let mut state = ConversationState::new();
        let report = agent.run_turn("s", &mut state, "restart kafka").await;

        assert!(report.executions.is_empty());
        let observation = &state.entries()[2];
        assert!(observation.content.starts_with("FAILURE: No dry-run plan was proposed"));
    }

    #[tokio::test]
    async fn test_result_is_relayed_verbatim() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().times(1).returning(|_| Ok(()));
        let decisions = MockDecisionMaker::new([
            plan("kafka"),
            execute("kafka"),
            // Paraphrased answer that omits the executor's text.
            Decision::answer("Kafka should be fine now."),
        ]);
        let agent = agent(decisions, runtime, 5);

        let mut state = ConversationState::new();
        let mut events = Vec::new();
        let report = agent
            .run_turn_observed("s", &mut state, "fix kafka", &mut |e: &TurnEvent| events.push(e.clone()))
            .await;

        assert_eq!(report.executions.len(), 1);
        assert_eq!(report.executions[0].status, ExecutionStatus::Success);
        assert!(report.answer.starts_with("Kafka should be fine now."));
        assert!(report.answer.contains(&report.executions[0].detail));
        assert_eq!(report.plans.len(), 1);
        assert!(matches!(events.last(), Some(TurnEvent::FinalAnswer(_))));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, TurnEvent::ToolOutput { .. }))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_decision_failure_ends_turn_but_not_session() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().times(0);
        let decisions = MockDecisionMaker::new([])
            .then_fail("connection refused");
        let agent = agent(decisions, runtime, 5);

        let mut state = ConversationState::new();
        let report = agent.run_turn("s", &mut state, "hello").await;
        assert!(matches!(report.outcome, TurnOutcome::DecisionFailed { .. }));
        assert!(report.answer.contains("connection refused"));

        // Script is exhausted; the next turn gets the default answer.
        let report = agent.run_turn("s", &mut state, "hello again").await;
        assert_eq!(report.outcome, TurnOutcome::Answered);
    }

    #[tokio::test]
    async fn test_plan_authorises_one_execution_only() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().times(1).returning(|_| Ok(()));
        let decisions = MockDecisionMaker::new([
            plan("kafka"),
            execute("kafka"),
            Decision::answer("Restarted."),
            execute("kafka"),
            Decision::answer("Tried again."),
        ]);
        let agent = agent(decisions, runtime, 5);

        let mut state = ConversationState::new();
        let first = agent.run_turn("s", &mut state, "fix kafka").await;
        assert_eq!(first.executions[0].status, ExecutionStatus::Success);
        assert!(state.plans().is_empty());

        let second = agent.run_turn("s", &mut state, "once more").await;
        assert!(second.executions.is_empty());
        let observation = &state.entries()[state.len() - 2];
        assert_eq!(observation.role, Role::Tool);
        assert!(observation
            .content
            .starts_with("FAILURE: No dry-run plan was proposed for 'restart_container' on 'kafka'."));
    }

    #[tokio::test]
    async fn test_aborted_execution_keeps_plan() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().times(1).returning(|_| Ok(()));
        let declined = Decision::call(
            "execute_remediation_action",
            json!({"action": "restart_container", "component": "kafka", "confirm_token": "no"}),
        );
        let decisions = MockDecisionMaker::new([
            plan("kafka"),
            declined,
            Decision::answer("Not confirmed."),
            execute("kafka"),
            Decision::answer("Restarted."),
        ]);
        let agent = agent(decisions, runtime, 5);

        let mut state = ConversationState::new();
        let first = agent.run_turn("s", &mut state, "fix kafka").await;
        assert_eq!(first.executions[0].status, ExecutionStatus::Aborted);
        assert_eq!(state.plans().len(), 1);

        let second = agent.run_turn("s", &mut state, "YES").await;
        assert_eq!(second.executions[0].status, ExecutionStatus::Success);
        assert!(state.plans().is_empty());
    }

    #[tokio::test]
    async fn test_calls_in_one_decision_run_in_order() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().times(1).returning(|_| Ok(()));
        let decisions = Arc::new(MockDecisionMaker::new([
            together(plan("kafka"), execute("kafka")),
            Decision::answer("Done."),
        ]));
        let agent = AgentRuntime::new(decisions.clone(), tools(runtime), "system".to_string(), 5);

        let mut state = ConversationState::new();
        let report = agent.run_turn("s", &mut state, "fix kafka").await;

        assert_eq!(report.steps, 2);
        assert_eq!(report.tool_calls, 2);
        assert_eq!(report.executions[0].status, ExecutionStatus::Success);

        // user, assistant with both calls, one observation per call in call order, answer
        let entries = state.entries();
        assert_eq!(entries.len(), 5);
        let calls = &entries[1].tool_calls;
        assert_eq!(entries[2].tool_call_id.as_deref(), Some(calls[0].id.as_str()));
        assert_eq!(entries[3].tool_call_id.as_deref(), Some(calls[1].id.as_str()));
        assert!(entries[2].content.contains("DRY-RUN REMEDIATION PLAN"));
        assert!(entries[3].content.starts_with("SUCCESS: Container 'kafka'"));

        // Second decision sees the assistant entry plus both observations.
        assert_eq!(decisions.observed_lengths(), vec![1, 4]);
    }

    #[tokio::test]
    async fn test_execute_before_plan_in_one_decision_is_refused() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().times(0);
        let decisions = MockDecisionMaker::new([
            together(execute("kafka"), plan("kafka")),
            Decision::answer("Plan ready."),
        ]);
        let agent = agent(decisions, runtime, 5);

        let mut state = ConversationState::new();
        let report = agent.run_turn("s", &mut state, "fix kafka").await;

        assert!(report.executions.is_empty());
        assert_eq!(report.plans.len(), 1);
        let entries = state.entries();
        assert!(entries[2]
            .content
            .starts_with("FAILURE: No dry-run plan was proposed"));
        assert!(entries[3].content.contains("DRY-RUN REMEDIATION PLAN"));
        assert_eq!(state.plans().len(), 1);
    }
}
