pub mod greeting;
pub mod math;

use crate::error::AppError;
use crate::tools::definition::{ParamKind, ParameterSchema, ToolDefinition};
use crate::tools::registry::{FnTool, ToolRegistry};

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "calculate_sum",
            "Calculate the sum of two numbers",
            ParameterSchema::new()
                .required("a", ParamKind::Number, "The first number")
                .required("b", ParamKind::Number, "The second number"),
        ),
        ToolDefinition::new(
            "add_two_numbers",
            "Add two numbers together",
            ParameterSchema::new()
                .required("a", ParamKind::Number, "The first number")
                .required("b", ParamKind::Number, "The second number"),
        ),
        ToolDefinition::new(
            "say_hello",
            "Say hello to the given name",
            ParameterSchema::new().required("name", ParamKind::String, "The name to greet"),
        ),
    ]
}

/// Registry holding every built-in tool, in [`definitions`] order.
pub fn registry() -> Result<ToolRegistry, AppError> {
    let mut registry = ToolRegistry::new();
    for def in definitions() {
        match def.name.as_str() {
            "calculate_sum" | "add_two_numbers" => registry.register(def, FnTool::new(math::sum))?,
            "say_hello" => registry.register(def, FnTool::new(greeting::say_hello))?,
            other => return Err(AppError::UnknownTool(other.to_string())),
        }
    }
    Ok(registry)
}
