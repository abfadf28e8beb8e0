use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Object => "object",
            ParamKind::Array => "array",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(ParamKind::String),
            "number" => Some(ParamKind::Number),
            "integer" => Some(ParamKind::Integer),
            "boolean" => Some(ParamKind::Boolean),
            "object" => Some(ParamKind::Object),
            "array" => Some(ParamKind::Array),
            _ => None,
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Number => value.is_number(),
            ParamKind::Integer => {
                value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Object => value.is_object(),
            ParamKind::Array => value.is_array(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub required: bool,
    pub description: Option<String>,
}

/// Ordered parameter contract of a tool. Rendered to and parsed from the
/// JSON-schema object form that completion endpoints expect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ParameterSchema {
    params: Vec<(String, ParamSpec)>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.with_param(name, kind, true, description)
    }

    pub fn optional(self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.with_param(name, kind, false, description)
    }

    fn with_param(mut self, name: &str, kind: ParamKind, required: bool, description: &str) -> Self {
        let description = Some(description.to_string()).filter(|d| !d.is_empty());
        let spec = ParamSpec { kind, required, description };
        match self.params.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = spec,
            None => self.params.push((name.to_string(), spec)),
        }
        self
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.params.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|(_, s)| s.required)
            .map(|(n, _)| n.as_str())
    }

    pub fn to_json(&self) -> Value {
        let mut properties = Map::new();
        for (name, spec) in &self.params {
            let mut prop = Map::new();
            prop.insert("type".to_string(), Value::String(spec.kind.as_str().to_string()));
            if let Some(desc) = &spec.description {
                prop.insert("description".to_string(), Value::String(desc.clone()));
            }
            properties.insert(name.clone(), Value::Object(prop));
        }
        let required = self
            .required_names()
            .map(|n| Value::String(n.to_string()))
            .collect::<Vec<_>>();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    /// Parses a JSON-schema object. Every name listed in `required` must be
    /// declared under `properties`.
    pub fn from_json(value: &Value) -> Result<Self, AppError> {
        let obj = value
            .as_object()
            .ok_or_else(|| AppError::InvalidSchema("parameters must be a JSON object".to_string()))?;

        if let Some(t) = obj.get("type") {
            if t.as_str() != Some("object") {
                return Err(AppError::InvalidSchema(format!(
                    "parameters type must be \"object\", got {t}"
                )));
            }
        }

        let mut params: Vec<(String, ParamSpec)> = Vec::new();
        if let Some(props) = obj.get("properties") {
            let props = props
                .as_object()
                .ok_or_else(|| AppError::InvalidSchema("properties must be an object".to_string()))?;
            for (name, prop) in props {
                let kind = prop
                    .get("type")
                    .and_then(|t| t.as_str())
                    .and_then(ParamKind::parse)
                    .ok_or_else(|| {
                        AppError::InvalidSchema(format!("property '{name}' has no supported type"))
                    })?;
                let description = prop
                    .get("description")
                    .and_then(|d| d.as_str())
                    .map(|d| d.to_string());
                params.push((
                    name.clone(),
                    ParamSpec {
                        kind,
                        required: false,
                        description,
                    },
                ));
            }
        }

        if let Some(required) = obj.get("required") {
            let required = required
                .as_array()
                .ok_or_else(|| AppError::InvalidSchema("required must be an array".to_string()))?;
            for name in required {
                let name = name
                    .as_str()
                    .ok_or_else(|| AppError::InvalidSchema("required entries must be strings".to_string()))?;
                let spec = params
                    .iter_mut()
                    .find(|(n, _)| n == name)
                    .map(|(_, s)| s)
                    .ok_or_else(|| {
                        AppError::InvalidSchema(format!(
                            "required field '{name}' is not declared in properties"
                        ))
                    })?;
                spec.required = true;
            }
        }

        Ok(Self { params })
    }
}

impl From<ParameterSchema> for Value {
    fn from(schema: ParameterSchema) -> Self {
        schema.to_json()
    }
}

impl TryFrom<Value> for ParameterSchema {
    type Error = AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        ParameterSchema::from_json(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: ParameterSchema,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, parameters: ParameterSchema) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// A tool invocation requested by the model. `arguments` is kept exactly as
/// the gateway sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub ok: bool,
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Measured handler time; `duration_ms` is its serialized, rounded form.
    #[serde(skip)]
    pub duration: Duration,
}

impl ToolResult {
    /// The structured payload handed back to the model.
    pub fn payload(&self) -> Value {
        if self.ok {
            return self.output.clone();
        }
        serde_json::json!({
            "error": self.error.clone().unwrap_or_default(),
            "kind": self.error_kind.clone().unwrap_or_else(|| "error".to_string())
        })
    }
}
