use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// The single JSON document a bridge invocation reads from stdin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestPayload {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default = "empty_context")]
    pub context: Value,
}

fn empty_context() -> Value {
    Value::Object(Map::new())
}

impl RequestPayload {
    pub fn decode(input: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| Error::InvalidInput(e.to_string()))?;
        if !value.is_object() {
            return Err(Error::InvalidInput(format!(
                "expected a JSON object, got {}",
                json_type_name(&value)
            )));
        }
        serde_json::from_value(value).map_err(|e| Error::InvalidInput(e.to_string()))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMode {
    /// Inline fragment, evaluated with the expression/statement fallback.
    Code(String),
    /// Skill file whose entry point is invoked with `params`.
    Skill(PathBuf),
}

/// One decoded request. Built once per invocation and never mutated.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub mode: ExecutionMode,
    pub params: Map<String, Value>,
    pub context: Value,
}

impl ExecutionRequest {
    pub fn code(payload: RequestPayload) -> Self {
        Self {
            mode: ExecutionMode::Code(payload.code),
            params: payload.params,
            context: payload.context,
        }
    }

    pub fn skill(skill_path: PathBuf, payload: RequestPayload) -> Self {
        Self {
            mode: ExecutionMode::Skill(skill_path),
            params: payload.params,
            context: payload.context,
        }
    }
}
