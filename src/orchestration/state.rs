use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    Normal,
    EmptyToolCallAnomaly,
    IterationLimitExceeded,
    Cancelled,
    GatewayError(String),
}

impl StopReason {
    pub fn is_normal(&self) -> bool {
        matches!(self, StopReason::Normal)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Normal => write!(f, "finished"),
            StopReason::EmptyToolCallAnomaly => write!(f, "model signalled tool calls but sent none"),
            StopReason::IterationLimitExceeded => write!(f, "iteration limit exceeded"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::GatewayError(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Stopped(StopReason),
}

impl Default for RunState {
    fn default() -> Self {
        RunState::Running
    }
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        match self {
            RunState::Running => None,
            RunState::Stopped(r) => Some(r),
        }
    }
}
