//! Process configuration, resolved once at startup.
//!
//! Environment variables:
//! - `MODEL_RUNNER_BASE_URL` - Required. Base URL of the OpenAI-compatible endpoint.
//! - `MODEL_NAME` - Required (falls back to `MODEL_LUCY_Q8_0`). Model identifier.
//! - `MODEL_API_KEY` - Optional. Bearer key; local runners need none.
//! - `MAX_ITERATIONS` - Optional. Gateway calls allowed per run. Defaults to `10`.
//! - `TEMPERATURE` - Optional. Defaults to `0`.
//! - `TOOL_TIMEOUT_MS` - Optional. Per tool call, at least 1. Defaults to `10000`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. Per gateway request. Defaults to `60`.
//! - `RUN_DEADLINE_SECS` - Optional. Wall-clock budget for a whole run.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::error::AppError;
use crate::models::llm::{GenerationParams, LLMRuntimeConfig};
use crate::orchestration::runner::RunOptions;
use crate::tools::executor::ToolLimits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LLMRuntimeConfig,
    pub max_iterations: usize,
    pub temperature: f64,
    pub tool_timeout_ms: u64,
    pub run_deadline: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = get("MODEL_RUNNER_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("MODEL_RUNNER_BASE_URL".to_string()))?;
        let model_id = get("MODEL_NAME")
            .or_else(|| get("MODEL_LUCY_Q8_0"))
            .ok_or_else(|| ConfigError::MissingEnvVar("MODEL_NAME".to_string()))?;

        let max_iterations = parse_or("MAX_ITERATIONS", get("MAX_ITERATIONS"), 10usize)?;
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let temperature = parse_or("TEMPERATURE", get("TEMPERATURE"), 0.0f64)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue(
                "TEMPERATURE".to_string(),
                format!("{temperature} is outside 0..=2"),
            ));
        }
        let tool_timeout_ms = parse_or("TOOL_TIMEOUT_MS", get("TOOL_TIMEOUT_MS"), 10_000u64)?;
        if tool_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "TOOL_TIMEOUT_MS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let request_timeout_secs = parse_or("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"), 60u64)?;
        let run_deadline = get("RUN_DEADLINE_SECS")
            .map(|v| parse("RUN_DEADLINE_SECS", &v).map(Duration::from_secs))
            .transpose()?;

        Ok(Self {
            llm: LLMRuntimeConfig {
                model_id,
                api_key: get("MODEL_API_KEY").unwrap_or_default(),
                base_url: Some(base_url),
                request_timeout_secs,
            },
            max_iterations,
            temperature,
            tool_timeout_ms,
            run_deadline,
        })
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            params: GenerationParams {
                temperature: self.temperature,
                ..GenerationParams::default()
            },
            max_iterations: self.max_iterations,
            deadline: self.run_deadline,
            system_prompt: None,
        }
    }

    pub fn tool_limits(&self) -> ToolLimits {
        ToolLimits {
            timeout_ms: self.tool_timeout_ms,
        }
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), raw.to_string()))
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(v) => parse(key, &v),
        None => Ok(default),
    }
}
