use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::tools::definition::{ToolCall, ToolResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: String,
    pub result: Value,
    pub ok: bool,
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
    pub iteration: usize,
}

impl CallRecord {
    pub fn new(call: &ToolCall, result: &ToolResult, started_at: DateTime<Utc>, iteration: usize) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: result.payload(),
            ok: result.ok,
            duration: result.duration,
            started_at,
            iteration,
        }
    }
}

/// Audit trail of executed tool calls for one run. Kept for reporting only;
/// the transcript stays the source of truth for the conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallLedger {
    records: Vec<CallRecord>,
}

impl CallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: CallRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_duration(&self) -> Duration {
        self.records.iter().map(|r| r.duration).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CallRecord> {
        self.records.iter().filter(|r| !r.ok)
    }
}
