use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool '{0}' is already registered")]
    DuplicateToolName(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("tool '{tool}' failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    #[error("tool '{tool}' timed out after {timeout_ms} ms; it may still complete in the background")]
    ToolTimedOut { tool: String, timeout_ms: u64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Message(String),
}

impl AppError {
    pub fn invalid_arguments(tool: &str, reason: impl Into<String>) -> Self {
        AppError::InvalidArguments {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }

    pub fn tool_failed(tool: &str, reason: impl Into<String>) -> Self {
        AppError::ToolFailed {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable snake_case tag, carried next to the message in error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Gateway(_) => "gateway_error",
            AppError::UnknownTool(_) => "unknown_tool",
            AppError::InvalidArguments { .. } => "invalid_arguments",
            AppError::DuplicateToolName(_) => "duplicate_tool_name",
            AppError::InvalidSchema(_) => "invalid_schema",
            AppError::ToolFailed { .. } => "tool_failed",
            AppError::ToolTimedOut { .. } => "timed_out",
            AppError::Config(_) => "config_error",
            AppError::Message(_) => "error",
        }
    }
}

/// Error raised by a tool handler. The executor attaches the tool name.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn into_app_error(self, tool: &str) -> AppError {
        match self {
            ToolError::InvalidArguments(reason) => AppError::invalid_arguments(tool, reason),
            ToolError::Failed(reason) => AppError::tool_failed(tool, reason),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::Message(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Message(value.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        AppError::Gateway(value.to_string())
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
