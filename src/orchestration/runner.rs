use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::AppError;
use crate::llm::provider::{Completion, LLMProvider, TokenUsage};
use crate::models::llm::GenerationParams;
use crate::orchestration::ledger::{CallLedger, CallRecord};
use crate::orchestration::state::{RunState, StopReason};
use crate::orchestration::transcript::Transcript;
use crate::tools::definition::{ToolCall, ToolDefinition};
use crate::tools::executor::ToolExecutor;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub params: GenerationParams,
    /// Upper bound on gateway calls for one run.
    pub max_iterations: usize,
    /// Wall-clock budget measured from [`ConversationRun::start`].
    pub deadline: Option<Duration>,
    pub system_prompt: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            params: GenerationParams::default(),
            max_iterations: 10,
            deadline: None,
            system_prompt: None,
        }
    }
}

/// Everything a finished run leaves behind. The ledger is complete up to
/// the point where the run stopped, whatever the reason.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub stop_reason: StopReason,
    pub final_answer: Option<String>,
    pub transcript: Transcript,
    pub ledger: CallLedger,
    pub iterations: usize,
    pub usage: TokenUsage,
}

impl RunReport {
    pub fn into_result(self) -> Result<String, AppError> {
        match self.stop_reason {
            StopReason::Normal => Ok(self.final_answer.unwrap_or_default()),
            StopReason::GatewayError(e) => Err(AppError::Gateway(e)),
            other => Err(AppError::Message(other.to_string())),
        }
    }
}

/// One conversation driven to completion. Owns its transcript and ledger;
/// nothing is shared with other runs except the provider and the registry.
pub struct ConversationRun {
    id: Uuid,
    provider: Arc<dyn LLMProvider>,
    executor: ToolExecutor,
    tools: Vec<ToolDefinition>,
    options: RunOptions,
    transcript: Transcript,
    ledger: CallLedger,
    state: RunState,
    iterations: usize,
    deadline: Option<Instant>,
    final_answer: Option<String>,
    usage: TokenUsage,
}

enum GatewayOutcome {
    Interrupted,
    Response(Result<(String, Completion, TokenUsage), AppError>),
}

impl ConversationRun {
    pub fn new(provider: Arc<dyn LLMProvider>, executor: ToolExecutor, options: RunOptions) -> Self {
        let tools = executor.registry().definitions();
        Self {
            id: Uuid::new_v4(),
            provider,
            executor,
            tools,
            options,
            transcript: Transcript::new(),
            ledger: CallLedger::new(),
            state: RunState::Running,
            iterations: 0,
            deadline: None,
            final_answer: None,
            usage: TokenUsage::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn ledger(&self) -> &CallLedger {
        &self.ledger
    }

    /// Seeds the transcript with the optional system prompt and the user
    /// message, and arms the deadline.
    pub fn start(&mut self, user_message: impl Into<String>) {
        if self.transcript.is_empty() {
            if let Some(system) = &self.options.system_prompt {
                self.transcript.push_system(system.clone());
            }
        }
        self.transcript.push_user(user_message);
        self.deadline = self.options.deadline.map(|d| Instant::now() + d);
    }

    /// Performs one iteration: a single gateway call and, when the model
    /// asks for tools, the whole batch of executions.
    pub async fn step(&mut self, cancel: &CancellationToken) -> RunState {
        if !self.state.is_running() {
            return self.state.clone();
        }
        if self.interrupted(cancel) {
            return self.stop(StopReason::Cancelled);
        }
        if self.iterations >= self.options.max_iterations {
            tracing::warn!(max_iterations = self.options.max_iterations, "iteration limit reached");
            return self.stop(StopReason::IterationLimitExceeded);
        }
        self.iterations += 1;
        debug_assert!(self.transcript.pending_tool_calls().is_empty());
        tracing::debug!(iteration = self.iterations, turns = self.transcript.len(), "calling gateway");

        let (content, completion, usage) = match self.call_gateway(cancel).await {
            GatewayOutcome::Interrupted => return self.stop(StopReason::Cancelled),
            GatewayOutcome::Response(Err(e)) => {
                tracing::error!(error = %e, "gateway call failed");
                return self.stop(StopReason::GatewayError(e.to_string()));
            }
            GatewayOutcome::Response(Ok(r)) => r,
        };
        self.usage.input_tokens = self.usage.input_tokens.saturating_add(usage.input_tokens);
        self.usage.output_tokens = self.usage.output_tokens.saturating_add(usage.output_tokens);

        match completion {
            Completion::FinalAnswer(text) => {
                self.transcript.push_assistant(text.clone(), Vec::new());
                self.final_answer = Some(text);
                self.stop(StopReason::Normal)
            }
            Completion::ToolCallsRequested(calls) if calls.is_empty() => {
                tracing::warn!("gateway finished with tool_calls but sent none");
                self.stop(StopReason::EmptyToolCallAnomaly)
            }
            Completion::ToolCallsRequested(calls) => {
                self.transcript.push_assistant(content, calls.clone());
                self.run_tool_batch(&calls).await;
                self.state.clone()
            }
        }
    }

    /// Drives the conversation until it stops and returns the report.
    pub async fn run(mut self, user_message: impl Into<String>, cancel: CancellationToken) -> RunReport {
        let span = tracing::info_span!("run", run_id = %self.id, model = %self.provider.model_id());
        async move {
            self.start(user_message);
            loop {
                if let RunState::Stopped(reason) = self.step(&cancel).await {
                    tracing::info!(
                        %reason,
                        iterations = self.iterations,
                        tool_calls = self.ledger.len(),
                        "run stopped"
                    );
                    break;
                }
            }
            // A timed-out handler may still be running; its effect lands before the report.
            self.executor.wait_for_abandoned().await;
            self.into_report()
        }
        .instrument(span)
        .await
    }

    pub fn into_report(self) -> RunReport {
        let stop_reason = match self.state {
            RunState::Stopped(reason) => reason,
            RunState::Running => StopReason::Cancelled,
        };
        RunReport {
            run_id: self.id,
            stop_reason,
            final_answer: self.final_answer,
            transcript: self.transcript,
            ledger: self.ledger,
            iterations: self.iterations,
            usage: self.usage,
        }
    }

    async fn call_gateway(&self, cancel: &CancellationToken) -> GatewayOutcome {
        let request = self
            .provider
            .chat_with_tools(self.transcript.turns(), &self.tools, &self.options.params);
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => GatewayOutcome::Interrupted,
            _ = expired => GatewayOutcome::Interrupted,
            resp = request => GatewayOutcome::Response(resp.and_then(|r| {
                let content = r.content.clone();
                let usage = r.usage.clone();
                r.into_completion().map(|c| (content, c, usage))
            })),
        }
    }

    // The batch always completes so each request gets exactly one result.
    async fn run_tool_batch(&mut self, calls: &[ToolCall]) {
        for call in calls {
            let started_at = Utc::now();
            let result = self.executor.execute(call).await;
            tracing::info!(
                tool = %call.name,
                tool_call_id = %call.id,
                ok = result.ok,
                duration_ms = result.duration_ms.unwrap_or_default(),
                "tool executed"
            );
            self.transcript
                .push_tool_result(call.id.clone(), call.name.clone(), result.payload());
            self.ledger
                .record(CallRecord::new(call, &result, started_at, self.iterations));
        }
    }

    fn interrupted(&self, cancel: &CancellationToken) -> bool {
        cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn stop(&mut self, reason: StopReason) -> RunState {
        self.state = RunState::Stopped(reason);
        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::LLMResponse;
    use crate::orchestration::transcript::Turn;
    use crate::tools::builtin;
    use crate::error::ToolError;
    use crate::tools::definition::ParameterSchema;
    use crate::tools::executor::ToolLimits;
    use crate::tools::registry::ToolHandler;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted responses and records the transcript length seen on
    /// each call.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<Result<LLMResponse, AppError>>>,
        seen: Mutex<Vec<Vec<Turn>>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<LLMResponse, AppError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<Turn>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        fn model_id(&self) -> &str {
            "scripted-model"
        }

        async fn chat_with_tools(
            &self,
            turns: &[Turn],
            _tools: &[ToolDefinition],
            _params: &GenerationParams,
        ) -> Result<LLMResponse, AppError> {
            self.seen.lock().unwrap().push(turns.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(LLMResponse::final_answer("Done.")))
        }
    }

    /// Never answers; used for cancellation and deadline tests.
    struct HangingProvider;

    #[async_trait]
    impl LLMProvider for HangingProvider {
        fn provider_name(&self) -> &'static str {
            "hanging"
        }

        fn model_id(&self) -> &str {
            "hanging-model"
        }

        async fn chat_with_tools(
            &self,
            _turns: &[Turn],
            _tools: &[ToolDefinition],
            _params: &GenerationParams,
        ) -> Result<LLMResponse, AppError> {
            std::future::pending().await
        }
    }

    fn call(id: &str, name: &str, args: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: args.to_string(),
        }
    }

    fn executor() -> ToolExecutor {
        ToolExecutor::new(Arc::new(builtin::registry().unwrap()))
    }

    /// Sleeps, then bumps a counter standing in for an external side effect.
    struct Notify {
        delay: Duration,
        effects: Arc<AtomicUsize>,
    }

    impl ToolHandler for Notify {
        fn call(&self, _args: Value) -> Result<Value, ToolError> {
            std::thread::sleep(self.delay);
            self.effects.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "sent": true }))
        }
    }

    /// Cancels the run's token from inside a tool batch.
    struct StopButton(CancellationToken);

    impl ToolHandler for StopButton {
        fn call(&self, _args: Value) -> Result<Value, ToolError> {
            self.0.cancel();
            Ok(json!({ "stopped": true }))
        }
    }

    fn executor_with(name: &str, handler: impl ToolHandler + 'static) -> ToolExecutor {
        let mut registry = builtin::registry().unwrap();
        registry
            .register(ToolDefinition::new(name, "Test tool", ParameterSchema::new()), handler)
            .unwrap();
        ToolExecutor::new(Arc::new(registry))
    }

    fn new_run(provider: Arc<dyn LLMProvider>) -> ConversationRun {
        ConversationRun::new(provider, executor(), RunOptions::default())
    }

    #[tokio::test]
    async fn tool_call_then_final_answer() {
        let provider = ScriptedProvider::new(vec![
            Ok(LLMResponse::tool_calls(vec![call("1", "add_two_numbers", r#"{"a":40,"b":2}"#)])),
            Ok(LLMResponse::final_answer("42")),
        ]);
        let report = new_run(provider.clone())
            .run("Add 40 and 2", CancellationToken::new())
            .await;

        assert_eq!(report.stop_reason, StopReason::Normal);
        assert_eq!(report.final_answer.as_deref(), Some("42"));
        assert_eq!(report.iterations, 2);
        assert_eq!(report.ledger.len(), 1);
        assert_eq!(report.ledger.records()[0].result, json!({ "result": 42 }));
        assert_eq!(report.ledger.records()[0].call_id, "1");

        let turns = report.transcript.turns();
        assert_eq!(turns.len(), 4);
        assert!(matches!(turns[1], Turn::Assistant { ref tool_calls, .. } if tool_calls.len() == 1));
        assert_eq!(
            turns[2],
            Turn::ToolResult {
                tool_call_id: "1".to_string(),
                name: "add_two_numbers".to_string(),
                payload: json!({ "result": 42 })
            }
        );
        assert_eq!(
            turns[3],
            Turn::Assistant {
                content: "42".to_string(),
                tool_calls: Vec::new()
            }
        );

        // Second gateway call already saw the request and its result.
        let seen = provider.calls();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[1].len(), 3);
    }

    #[tokio::test]
    async fn empty_tool_call_list_is_an_anomaly() {
        let provider = ScriptedProvider::new(vec![Ok(LLMResponse::tool_calls(Vec::new()))]);
        let report = new_run(provider).run("hi", CancellationToken::new()).await;

        assert_eq!(report.stop_reason, StopReason::EmptyToolCallAnomaly);
        assert!(report.ledger.is_empty());
        assert_eq!(report.transcript.len(), 1);
        assert!(report.into_result().is_err());
    }

    #[tokio::test]
    async fn invalid_arguments_do_not_abort_the_run() {
        let provider = ScriptedProvider::new(vec![
            Ok(LLMResponse::tool_calls(vec![call("1", "calculate_sum", r#"{"a":"oops"}"#)])),
            Ok(LLMResponse::final_answer("I could not add those.")),
        ]);
        let report = new_run(provider).run("Add oops", CancellationToken::new()).await;

        assert_eq!(report.stop_reason, StopReason::Normal);
        assert_eq!(report.ledger.len(), 1);
        let record = &report.ledger.records()[0];
        assert!(!record.ok);
        assert_eq!(record.result["kind"], json!("invalid_arguments"));
        assert!(matches!(
            report.transcript.turns()[2],
            Turn::ToolResult { ref payload, .. } if payload.get("error").is_some()
        ));
    }

    #[tokio::test]
    async fn gateway_error_on_first_call_leaves_state_untouched() {
        let provider = ScriptedProvider::new(vec![Err(AppError::Gateway("connection refused".to_string()))]);
        let report = new_run(provider).run("hi", CancellationToken::new()).await;

        assert!(matches!(report.stop_reason, StopReason::GatewayError(ref e) if e.contains("connection refused")));
        assert!(report.ledger.is_empty());
        assert_eq!(
            report.transcript.turns(),
            &[Turn::User {
                content: "hi".to_string()
            }]
        );
        assert!(matches!(report.into_result(), Err(AppError::Gateway(_))));
    }

    #[tokio::test]
    async fn gateway_error_keeps_accumulated_ledger() {
        let provider = ScriptedProvider::new(vec![
            Ok(LLMResponse::tool_calls(vec![call("1", "say_hello", r#"{"name":"Bob"}"#)])),
            Err(AppError::Gateway("quota exceeded".to_string())),
        ]);
        let report = new_run(provider).run("hi", CancellationToken::new()).await;

        assert!(matches!(report.stop_reason, StopReason::GatewayError(_)));
        assert_eq!(report.ledger.len(), 1);
        assert_eq!(report.transcript.len(), 3);
    }

    #[tokio::test]
    async fn calls_run_in_received_order() {
        let provider = ScriptedProvider::new(vec![
            Ok(LLMResponse::tool_calls(vec![
                call("a", "say_hello", r#"{"name":"Bob"}"#),
                call("b", "calculate_sum", r#"{"a":5,"b":37}"#),
                call("c", "say_hello", r#"{"name":"Alice"}"#),
            ])),
            Ok(LLMResponse::final_answer("done")),
        ]);
        let report = new_run(provider).run("go", CancellationToken::new()).await;

        let ids: Vec<&str> = report.ledger.records().iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let result_ids: Vec<&str> = report
            .transcript
            .turns()
            .iter()
            .filter_map(|t| match t {
                Turn::ToolResult { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(result_ids, vec!["a", "b", "c"]);
        assert!(report.transcript.pending_tool_calls().is_empty());
    }

    #[tokio::test]
    async fn iteration_limit_stops_a_looping_model() {
        let responses = (0..5)
            .map(|i| {
                Ok(LLMResponse::tool_calls(vec![call(
                    &i.to_string(),
                    "say_hello",
                    r#"{"name":"Bob"}"#,
                )]))
            })
            .collect();
        let provider = ScriptedProvider::new(responses);
        let options = RunOptions {
            max_iterations: 3,
            ..RunOptions::default()
        };
        let report = ConversationRun::new(provider.clone(), executor(), options)
            .run("loop", CancellationToken::new())
            .await;

        assert_eq!(report.stop_reason, StopReason::IterationLimitExceeded);
        assert_eq!(report.iterations, 3);
        assert_eq!(report.ledger.len(), 3);
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_gateway_call() {
        let provider = ScriptedProvider::new(vec![Ok(LLMResponse::final_answer("never"))]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = new_run(provider.clone()).run("hi", cancel).await;

        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert!(provider.calls().is_empty());
        assert_eq!(report.transcript.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_gateway_call() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let report = new_run(Arc::new(HangingProvider)).run("hi", cancel).await;

        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(report.transcript.len(), 1);
    }

    #[tokio::test]
    async fn deadline_stops_the_run() {
        let options = RunOptions {
            deadline: Some(Duration::from_millis(20)),
            ..RunOptions::default()
        };
        let report = ConversationRun::new(Arc::new(HangingProvider), executor(), options)
            .run("hi", CancellationToken::new())
            .await;

        assert_eq!(report.stop_reason, StopReason::Cancelled);
    }

    #[tokio::test]
    async fn system_prompt_precedes_user_turn() {
        let provider = ScriptedProvider::new(vec![Ok(LLMResponse::final_answer("ok"))]);
        let options = RunOptions {
            system_prompt: Some("You are terse.".to_string()),
            ..RunOptions::default()
        };
        let report = ConversationRun::new(provider.clone(), executor(), options)
            .run("hi", CancellationToken::new())
            .await;

        assert_eq!(
            provider.calls()[0],
            vec![
                Turn::System {
                    content: "You are terse.".to_string()
                },
                Turn::User {
                    content: "hi".to_string()
                },
            ]
        );
        assert_eq!(report.into_result().unwrap(), "ok");
    }

    #[tokio::test]
    async fn replaying_the_same_script_is_deterministic() {
        let script = || {
            vec![
                Ok(LLMResponse::tool_calls(vec![
                    call("1", "calculate_sum", r#"{"a":40,"b":2}"#),
                    call("2", "say_hello", r#"{"name":"Bob"}"#),
                ])),
                Ok(LLMResponse::final_answer("Hello Bob, the sum is 42")),
            ]
        };
        let first = new_run(ScriptedProvider::new(script()))
            .run("go", CancellationToken::new())
            .await;
        let second = new_run(ScriptedProvider::new(script()))
            .run("go", CancellationToken::new())
            .await;

        assert_eq!(first.transcript, second.transcript);
        let strip = |r: &RunReport| {
            r.ledger
                .records()
                .iter()
                .map(|c| (c.call_id.clone(), c.tool_name.clone(), c.arguments.clone(), c.result.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(&first), strip(&second));
    }

    #[tokio::test]
    async fn step_after_stop_is_a_no_op() {
        let provider = ScriptedProvider::new(vec![Ok(LLMResponse::final_answer("ok"))]);
        let mut run = new_run(provider.clone());
        let cancel = CancellationToken::new();
        run.start("hi");

        assert_eq!(run.step(&cancel).await, RunState::Stopped(StopReason::Normal));
        assert_eq!(run.step(&cancel).await, RunState::Stopped(StopReason::Normal));
        assert_eq!(provider.calls().len(), 1);
        assert_eq!(run.transcript().len(), 2);
    }

    #[tokio::test]
    async fn independent_runs_share_nothing() {
        let runs = (0..4).map(|i| {
            let provider = ScriptedProvider::new(vec![
                Ok(LLMResponse::tool_calls(vec![call("1", "calculate_sum", &format!(r#"{{"a":{i},"b":1}}"#))])),
                Ok(LLMResponse::final_answer(format!("{}", i + 1))),
            ]);
            new_run(provider).run(format!("run {i}"), CancellationToken::new())
        });
        let reports = futures::future::join_all(runs).await;

        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.final_answer.as_deref(), Some((i + 1).to_string().as_str()));
            assert_eq!(report.ledger.len(), 1);
            assert_eq!(report.ledger.records()[0].result, json!({ "result": i + 1 }));
        }
    }

    #[tokio::test]
    async fn ledger_keeps_sub_millisecond_durations() {
        let effects = Arc::new(AtomicUsize::new(0));
        let exec = executor_with(
            "notify",
            Notify {
                delay: Duration::from_micros(700),
                effects,
            },
        );
        let provider = ScriptedProvider::new(vec![
            Ok(LLMResponse::tool_calls(vec![call("1", "notify", "{}")])),
            Ok(LLMResponse::final_answer("sent")),
        ]);
        let report = ConversationRun::new(provider, exec, RunOptions::default())
            .run("notify me", CancellationToken::new())
            .await;

        let record = &report.ledger.records()[0];
        assert!(record.ok);
        assert!(record.duration >= Duration::from_micros(700));
    }

    #[tokio::test]
    async fn timed_out_tool_finishes_before_the_report() {
        let effects = Arc::new(AtomicUsize::new(0));
        let exec = executor_with(
            "notify",
            Notify {
                delay: Duration::from_millis(150),
                effects: effects.clone(),
            },
        )
        .with_limits(ToolLimits { timeout_ms: 20 });
        let provider = ScriptedProvider::new(vec![
            Ok(LLMResponse::tool_calls(vec![call("1", "notify", "{}")])),
            Ok(LLMResponse::final_answer("The notification may have been sent.")),
        ]);
        let report = ConversationRun::new(provider, exec, RunOptions::default())
            .run("notify me", CancellationToken::new())
            .await;

        assert_eq!(report.stop_reason, StopReason::Normal);
        let record = &report.ledger.records()[0];
        assert!(!record.ok);
        assert_eq!(record.result["kind"], json!("timed_out"));
        assert_eq!(effects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_during_a_batch_lets_the_batch_finish() {
        let cancel = CancellationToken::new();
        let exec = executor_with("stop", StopButton(cancel.clone()));
        let provider = ScriptedProvider::new(vec![
            Ok(LLMResponse::tool_calls(vec![
                call("1", "stop", "{}"),
                call("2", "say_hello", r#"{"name":"Bob"}"#),
            ])),
            Ok(LLMResponse::final_answer("never reached")),
        ]);
        let report = ConversationRun::new(provider.clone(), exec, RunOptions::default())
            .run("hi", cancel)
            .await;

        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(report.ledger.len(), 2);
        assert!(report.ledger.records().iter().all(|r| r.ok));
        assert!(report.transcript.pending_tool_calls().is_empty());
        assert_eq!(provider.calls().len(), 1);
    }
}
