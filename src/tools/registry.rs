use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, ToolError};
use crate::tools::definition::ToolDefinition;

/// A local function the model may ask for. Handlers receive arguments that
/// already passed schema validation and must not touch orchestration state.
pub trait ToolHandler: Send + Sync {
    fn call(&self, args: Value) -> Result<Value, ToolError>;
}

/// Adapts a typed pure function into a [`ToolHandler`]: arguments are decoded
/// into `A`, the return value is serialized back to JSON.
pub struct FnTool<A, R, F> {
    func: F,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A, R, F> FnTool<A, R, F>
where
    A: DeserializeOwned,
    R: Serialize,
    F: Fn(A) -> Result<R, ToolError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _marker: PhantomData,
        }
    }
}

impl<A, R, F> ToolHandler for FnTool<A, R, F>
where
    A: DeserializeOwned,
    R: Serialize,
    F: Fn(A) -> Result<R, ToolError> + Send + Sync,
{
    fn call(&self, args: Value) -> Result<Value, ToolError> {
        let args: A = serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let out = (self.func)(args)?;
        serde_json::to_value(out).map_err(|e| ToolError::Failed(e.to_string()))
    }
}

#[derive(Clone)]
struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

/// Ordered set of tools, unique by name. Built once, then shared read-only.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: ToolDefinition, handler: impl ToolHandler + 'static) -> Result<(), AppError> {
        if definition.name.trim().is_empty() {
            return Err(AppError::InvalidSchema("tool name must not be empty".to_string()));
        }
        if self.index.contains_key(&definition.name) {
            return Err(AppError::DuplicateToolName(definition.name));
        }
        self.index.insert(definition.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            definition,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolDefinition, AppError> {
        self.entry(name).map(|t| &t.definition)
    }

    pub(crate) fn handler(&self, name: &str) -> Result<Arc<dyn ToolHandler>, AppError> {
        self.entry(name).map(|t| t.handler.clone())
    }

    fn entry(&self, name: &str) -> Result<&RegisteredTool, AppError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| AppError::UnknownTool(name.to_string()))
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.definition.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
