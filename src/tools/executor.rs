use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio_util::task::TaskTracker;

use crate::error::AppError;
use crate::tools::definition::{ParameterSchema, ToolCall, ToolResult};
use crate::tools::registry::ToolRegistry;

#[derive(Debug, Clone)]
pub struct ToolLimits {
    pub timeout_ms: u64,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Runs tool calls against a frozen registry. Handler tasks are tracked, so
/// a call that outlives its timeout can still be awaited with
/// [`ToolExecutor::wait_for_abandoned`]. Clones share that set of tasks.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    limits: ToolLimits,
    tasks: TaskTracker,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            limits: ToolLimits::default(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn with_limits(mut self, limits: ToolLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs one tool call. Never fails: lookup, validation, and handler
    /// errors are returned as a non-ok [`ToolResult`].
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let started = Instant::now();
        let output = self.execute_inner(call).await;
        let duration = started.elapsed();
        let duration_ms = duration.as_millis().min(u128::from(u64::MAX)) as u64;

        match output {
            Ok(v) => ToolResult {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                ok: true,
                output: v,
                error: None,
                error_kind: None,
                duration_ms: Some(duration_ms),
                duration,
            },
            Err(e) => {
                tracing::warn!(tool = %call.name, tool_call_id = %call.id, error = %e, "tool call failed");
                ToolResult {
                    tool_call_id: call.id.clone(),
                    name: call.name.clone(),
                    ok: false,
                    output: serde_json::json!({}),
                    error: Some(e.to_string()),
                    error_kind: Some(e.kind().to_string()),
                    duration_ms: Some(duration_ms),
                    duration,
                }
            }
        }
    }

    async fn execute_inner(&self, call: &ToolCall) -> Result<Value, AppError> {
        let definition = self.registry.resolve(&call.name)?;
        let args = validate_arguments(&call.name, &definition.parameters, &call.arguments)?;
        let handler = self.registry.handler(&call.name)?;

        let name = call.name.clone();
        let timeout_ms = self.limits.timeout_ms;
        let fut = self.tasks.spawn_blocking(move || handler.call(args));
        match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
            Ok(Ok(res)) => res.map_err(|e| e.into_app_error(&name)),
            Ok(Err(join_err)) => Err(AppError::tool_failed(&name, join_err.to_string())),
            // The handler keeps running on the blocking pool; the tracker still owns it.
            Err(_) => Err(AppError::ToolTimedOut { tool: name, timeout_ms }),
        }
    }

    /// Waits until every handler started by this executor has returned,
    /// including ones whose calls were already reported as timed out.
    pub async fn wait_for_abandoned(&self) {
        if self.tasks.is_empty() {
            return;
        }
        tracing::info!(pending = self.tasks.len(), "waiting for timed-out tool calls to finish");
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

/// Parses the raw argument string and checks it against the declared schema.
/// Undeclared fields are passed through untouched.
pub fn validate_arguments(tool: &str, schema: &ParameterSchema, raw: &str) -> Result<Value, AppError> {
    let raw = raw.trim();
    let parsed: Value = if raw.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(raw).map_err(|e| AppError::invalid_arguments(tool, format!("arguments are not valid JSON: {e}")))?
    };

    let obj = parsed
        .as_object()
        .ok_or_else(|| AppError::invalid_arguments(tool, "arguments must be a JSON object"))?;

    for (name, spec) in schema.params() {
        match obj.get(name) {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(AppError::invalid_arguments(tool, format!("missing required field '{name}'")));
                }
            }
            Some(v) if !spec.kind.matches(v) => {
                return Err(AppError::invalid_arguments(
                    tool,
                    format!("field '{name}' must be of type {}", spec.kind.as_str()),
                ));
            }
            Some(_) => {}
        }
    }

    Ok(parsed)
}
