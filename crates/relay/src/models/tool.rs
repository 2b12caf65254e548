use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON type of a declared tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Number => "number",
            ParameterKind::Boolean => "boolean",
            ParameterKind::Object => "object",
            ParameterKind::Array => "array",
        }
    }

    /// Whether a JSON value matches this declared type. Integers count as
    /// numbers, per JSON Schema.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParameterKind::String => value.is_string(),
            ParameterKind::Number => value.is_number(),
            ParameterKind::Boolean => value.is_boolean(),
            ParameterKind::Object => value.is_object(),
            ParameterKind::Array => value.is_array(),
        }
    }
}

/// A single declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,
    pub description: String,
}

impl ToolParameter {
    pub fn new<N, D>(name: N, kind: ParameterKind, required: bool, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolParameter {
            name: name.into(),
            kind,
            required,
            description: description.into(),
        }
    }
}

/// A tool that can be used by a model.
///
/// Parameters are declared as an ordered list rather than a raw JSON schema
/// so the registry can validate calls against them; the wire schema is
/// rendered on demand by [`Tool::input_schema`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool, unique within a registry
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// Parameters the tool accepts, in declaration order
    pub parameters: Vec<ToolParameter>,
}

impl Tool {
    pub fn new<N, D>(name: N, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Declare a parameter. Declaration order is preserved in the schema's
    /// `required` array.
    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Render the declared parameters as a JSON Schema object for the wire.
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for parameter in &self.parameters {
            properties.insert(
                parameter.name.clone(),
                json!({
                    "type": parameter.kind.as_str(),
                    "description": parameter.description,
                }),
            );
            if parameter.required {
                required.push(Value::String(parameter.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The arguments for the execution
    pub arguments: Value,
}

impl ToolCall {
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_schema_rendering() {
        let tool = Tool::new("save_report", "Saves a report to disk")
            .with_parameter(ToolParameter::new(
                "report_content",
                ParameterKind::String,
                true,
                "The full text of the report",
            ))
            .with_parameter(ToolParameter::new(
                "patient_name",
                ParameterKind::String,
                false,
                "Patient name used in the filename",
            ));

        let schema = tool.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(
            schema["properties"]["report_content"]["type"],
            json!("string")
        );
        assert_eq!(schema["required"], json!(["report_content"]));
    }

    #[test]
    fn test_parameter_kind_matches() {
        assert!(ParameterKind::String.matches(&json!("x")));
        assert!(ParameterKind::Number.matches(&json!(3)));
        assert!(ParameterKind::Number.matches(&json!(3.5)));
        assert!(!ParameterKind::Boolean.matches(&json!("true")));
        assert!(ParameterKind::Array.matches(&json!([1, 2])));
    }
}
