use std::fmt::Write;

use crate::orchestration::ledger::CallLedger;

const RULE_WIDTH: usize = 60;

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

/// Plain-text summary of every tool call in the ledger.
pub fn render_summary(ledger: &CallLedger, max_field_len: usize) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "FUNCTION CALL SUMMARY");
    let _ = writeln!(out, "{rule}");

    if ledger.is_empty() {
        let _ = writeln!(out, "No function calls were executed");
    } else {
        let _ = writeln!(out, "Total function calls executed: {}", ledger.len());
        let failed = ledger.failures().count();
        if failed > 0 {
            let _ = writeln!(out, "Failed: {failed}");
        }
        let _ = writeln!(out);

        for (i, call) in ledger.records().iter().enumerate() {
            let status = if call.ok { "OK" } else { "ERROR" };
            let _ = writeln!(out, "{}. Function: {} [{status}]", i + 1, call.tool_name);
            let _ = writeln!(out, "   Arguments: {}", truncate(&call.arguments, max_field_len));
            let _ = writeln!(out, "   Result: {}", truncate(&call.result.to_string(), max_field_len));
            let _ = writeln!(out, "   Call ID: {}", call.call_id);
            let _ = writeln!(out, "   Duration: {:?}", call.duration);
            if i + 1 < ledger.len() {
                let _ = writeln!(out);
            }
        }
    }

    let _ = writeln!(out, "{rule}");
    out
}
