use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::llm::GenerationParams;
use crate::orchestration::transcript::Turn;
use crate::tools::definition::{ToolCall, ToolDefinition};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    #[serde(default)]
    pub usage: TokenUsage,
    pub model: String,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// What the model asked for on one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    FinalAnswer(String),
    ToolCallsRequested(Vec<ToolCall>),
}

impl LLMResponse {
    pub fn final_answer(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
            model: String::new(),
            finish_reason: Some("stop".to_string()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            content: String::new(),
            usage: TokenUsage::default(),
            model: String::new(),
            finish_reason: Some("tool_calls".to_string()),
            tool_calls: calls,
        }
    }

    /// Classifies the response by its finish reason. Unknown reasons and
    /// repeated call ids are treated as a malformed response.
    pub fn into_completion(self) -> Result<Completion, AppError> {
        let mut seen = HashSet::new();
        for call in &self.tool_calls {
            if !seen.insert(call.id.as_str()) {
                return Err(AppError::Gateway(format!(
                    "malformed response: duplicate tool call id '{}'",
                    call.id
                )));
            }
        }

        match self.finish_reason.as_deref() {
            Some("tool_calls") | Some("function_call") => Ok(Completion::ToolCallsRequested(self.tool_calls)),
            Some("stop") | Some("length") | Some("eos") | None => {
                // Some local runners report "stop" alongside tool calls.
                if self.tool_calls.is_empty() {
                    Ok(Completion::FinalAnswer(self.content))
                } else {
                    Ok(Completion::ToolCallsRequested(self.tool_calls))
                }
            }
            Some(other) => Err(AppError::Gateway(format!("unexpected finish reason '{other}'"))),
        }
    }
}

/// Boundary to the completion service. One call per loop iteration.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;
    fn model_id(&self) -> &str;

    async fn chat_with_tools(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
        params: &GenerationParams,
    ) -> Result<LLMResponse, AppError>;
}
