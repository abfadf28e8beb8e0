use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::definition::ToolCall;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        tool_call_id: String,
        name: String,
        payload: Value,
    },
}

/// Ordered, append-only conversation history. Turns are never edited or
/// removed once pushed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::System {
            content: content.into(),
        });
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::User {
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, tool_calls: Vec<ToolCall>) {
        self.turns.push(Turn::Assistant {
            content: content.into(),
            tool_calls,
        });
    }

    pub fn push_tool_result(&mut self, tool_call_id: impl Into<String>, name: impl Into<String>, payload: Value) {
        self.turns.push(Turn::ToolResult {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            payload,
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Ids of assistant tool calls that have no result turn after them yet.
    pub fn pending_tool_calls(&self) -> Vec<&str> {
        let mut pending: Vec<&str> = Vec::new();
        for turn in &self.turns {
            match turn {
                Turn::Assistant { tool_calls, .. } => {
                    pending.extend(tool_calls.iter().map(|c| c.id.as_str()));
                }
                Turn::ToolResult { tool_call_id, .. } => {
                    if let Some(pos) = pending.iter().position(|id| id == tool_call_id) {
                        pending.remove(pos);
                    }
                }
                _ => {}
            }
        }
        pending
    }
}
