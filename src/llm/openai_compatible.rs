use crate::error::AppError;
use crate::llm::provider::{LLMProvider, LLMResponse, TokenUsage};
use crate::models::llm::{GenerationParams, LLMRuntimeConfig};
use crate::orchestration::transcript::Turn;
use crate::tools::definition::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;

#[derive(Clone)]
pub struct OpenAICompatibleProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OpenAICompatibleProvider {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Result<Self, AppError> {
        Self::with_timeout(api_key, model, base_url, 60)
    }

    pub fn from_config(cfg: &LLMRuntimeConfig) -> Result<Self, AppError> {
        if cfg.model_id.trim().is_empty() {
            return Err(AppError::Config("model config is missing model_id".to_string()));
        }
        Self::with_timeout(
            cfg.api_key.clone(),
            cfg.model_id.clone(),
            cfg.base_url.clone(),
            cfg.request_timeout_secs,
        )
    }

    fn with_timeout(api_key: String, model: String, base_url: Option<String>, timeout_secs: u64) -> Result<Self, AppError> {
        let base_url = normalize_openai_compatible_base_url(base_url);
        let mut headers = HeaderMap::new();
        // Local model runners accept anonymous requests.
        if !api_key.trim().is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                    .map_err(|e| AppError::Config(e.to_string()))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("tool-agent/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            client,
            model,
            base_url,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn provider_name(&self) -> &'static str {
        "openai_compatible"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn chat_with_tools(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
        params: &GenerationParams,
    ) -> Result<LLMResponse, AppError> {
        let body = request_body(&self.model, turns, tools, params);

        let resp = self.client.post(self.endpoint()).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "".to_string());
            return Err(AppError::Gateway(format!(
                "OpenAI-compatible error: {status} {text}"
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("malformed response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Gateway("malformed response: no choices".to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let usage = parsed.usage.unwrap_or_default();

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens.unwrap_or_default(),
                output_tokens: usage.completion_tokens.unwrap_or_default(),
            },
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            finish_reason: choice.finish_reason,
            tool_calls,
        })
    }
}

pub fn request_body(model: &str, turns: &[Turn], tools: &[ToolDefinition], params: &GenerationParams) -> serde_json::Value {
    let tool_defs = tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters.to_json()
                }
            })
        })
        .collect::<Vec<_>>();

    let messages = turns.iter().map(to_openai_message).collect::<Vec<_>>();

    let mut obj = serde_json::Map::new();
    obj.insert("model".to_string(), model.into());
    obj.insert("messages".to_string(), serde_json::Value::Array(messages));
    obj.insert("temperature".to_string(), params.temperature.into());
    if let Some(max_tokens) = params.max_tokens {
        obj.insert("max_tokens".to_string(), max_tokens.into());
    }
    if !tool_defs.is_empty() {
        obj.insert("tools".to_string(), serde_json::Value::Array(tool_defs));
        obj.insert("tool_choice".to_string(), params.tool_choice.to_json());
        if let Some(parallel) = params.parallel_tool_calls {
            obj.insert("parallel_tool_calls".to_string(), parallel.into());
        }
    }
    serde_json::Value::Object(obj)
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    pub model: Option<String>,
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIToolCall {
    pub id: String,
    pub function: OpenAIFunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn to_openai_message(turn: &Turn) -> serde_json::Value {
    match turn {
        Turn::System { content } => serde_json::json!({ "role": "system", "content": content }),
        Turn::User { content } => serde_json::json!({ "role": "user", "content": content }),
        Turn::Assistant { content, tool_calls } if tool_calls.is_empty() => {
            serde_json::json!({ "role": "assistant", "content": content })
        }
        Turn::Assistant { content, tool_calls } => {
            let mapped = tool_calls
                .iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": { "name": tc.name, "arguments": tc.arguments }
                    })
                })
                .collect::<Vec<_>>();
            let content = if content.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::String(content.clone())
            };
            serde_json::json!({ "role": "assistant", "content": content, "tool_calls": mapped })
        }
        Turn::ToolResult {
            tool_call_id,
            payload,
            ..
        } => serde_json::json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": payload.to_string()
        }),
    }
}

pub fn normalize_openai_compatible_base_url(base_url: Option<String>) -> String {
    let default_url = "https://api.openai.com/v1".to_string();
    let Some(mut base) = base_url else {
        return default_url;
    };
    base = base.trim().to_string();
    if base.is_empty() {
        return default_url;
    }

    // Users sometimes paste full endpoint.
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        base = trimmed
            .strip_suffix("/chat/completions")
            .unwrap_or(trimmed)
            .to_string();
    }

    // Only append /v1 when no path provided.
    match url::Url::parse(&base) {
        Ok(url) => {
            let path = url.path();
            if path.is_empty() || path == "/" {
                return format!("{}/v1", base.trim_end_matches('/'));
            }
            base.trim_end_matches('/').to_string()
        }
        Err(_) => base.trim_end_matches('/').to_string(),
    }
}
