//! Tool-calling conversation runner.
//!
//! A [`ConversationRun`] alternates between a completion gateway
//! ([`LLMProvider`]) and locally registered tools ([`ToolRegistry`]) until the
//! model gives a final answer, keeping an append-only [`Transcript`] and a
//! [`CallLedger`] of every tool invocation.

pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod orchestration;
pub mod tools;

pub use error::{AppError, ToolError};
pub use llm::provider::{Completion, LLMProvider, LLMResponse};
pub use models::llm::{GenerationParams, LLMRuntimeConfig, ToolChoice};
pub use orchestration::ledger::{CallLedger, CallRecord};
pub use orchestration::runner::{ConversationRun, RunOptions, RunReport};
pub use orchestration::state::{RunState, StopReason};
pub use orchestration::transcript::{Transcript, Turn};
pub use tools::definition::{ParamKind, ParameterSchema, ToolCall, ToolDefinition, ToolResult};
pub use tools::executor::{ToolExecutor, ToolLimits};
pub use tools::registry::{FnTool, ToolHandler, ToolRegistry};
