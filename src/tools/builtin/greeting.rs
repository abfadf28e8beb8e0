use serde::{Deserialize, Serialize};

use crate::error::ToolError;

#[derive(Debug, Deserialize)]
pub struct HelloArgs {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct HelloOutput {
    pub message: String,
}

pub fn say_hello(args: HelloArgs) -> Result<HelloOutput, ToolError> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(ToolError::InvalidArguments("name must not be empty".to_string()));
    }
    Ok(HelloOutput {
        message: format!("👋 Hello, {name}!🙂"),
    })
}
