use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

#[derive(Debug, Deserialize)]
pub struct SumArgs {
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Serialize)]
pub struct SumOutput {
    pub result: Value,
}

pub fn sum(args: SumArgs) -> Result<SumOutput, ToolError> {
    let total = args.a + args.b;
    if !total.is_finite() {
        return Err(ToolError::Failed("sum is not a finite number".to_string()));
    }
    Ok(SumOutput {
        result: number_value(total),
    })
}

/// Integral values are emitted as JSON integers so `40 + 2` reads `42`.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}
