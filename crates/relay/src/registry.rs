use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};

/// Boxed async callable behind a registered tool. Takes the validated
/// arguments object; returns the tool output text or an error message that
/// will be shown to the model.
pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<String, String>> + Send + Sync>;

/// A registered tool: the declared schema plus its handler.
#[derive(Clone)]
pub struct ToolSpec {
    tool: Tool,
    handler: ToolHandler,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("tool", &self.tool)
            .finish_non_exhaustive()
    }
}

impl ToolSpec {
    pub fn new<F, Fut>(tool: Tool, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<String, String>> + Send + 'static,
    {
        ToolSpec {
            tool,
            handler: Arc::new(move |arguments| Box::pin(handler(arguments))),
        }
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    pub fn name(&self) -> &str {
        &self.tool.name
    }
}

/// Maps tool names to specs and dispatches calls.
///
/// Registration order is preserved; it is the order schemas are presented to
/// the model. Dispatch never raises tool failures: validation errors and
/// handler errors come back as `Err` values the agent folds into the
/// conversation so the model can see and react to them.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique within a registry.
    pub fn register(&mut self, spec: ToolSpec) -> AgentResult<()> {
        if self.specs.iter().any(|s| s.name() == spec.name()) {
            return Err(AgentError::DuplicateTool(spec.name().to_string()));
        }
        self.specs.push(spec);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> AgentResult<&ToolSpec> {
        self.specs
            .iter()
            .find(|spec| spec.name() == name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    /// Schemas of all registered tools, in registration order.
    pub fn schemas(&self) -> Vec<Tool> {
        self.specs.iter().map(|spec| spec.tool.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Execute a tool call: validate the arguments against the declared
    /// parameters, then run the handler. All failure modes are returned as
    /// `Err` values, never raised past the caller.
    pub async fn dispatch(&self, call: &ToolCall) -> AgentResult<String> {
        let start = Instant::now();
        let result = self.dispatch_inner(call).await;
        tracing::debug!(
            tool = %call.name,
            ok = result.is_ok(),
            duration_ms = start.elapsed().as_millis() as u64,
            "tool dispatch"
        );
        result
    }

    async fn dispatch_inner(&self, call: &ToolCall) -> AgentResult<String> {
        let spec = self.resolve(&call.name)?;
        validate_arguments(&spec.tool, &call.arguments)?;
        (spec.handler)(call.arguments.clone())
            .await
            .map_err(AgentError::ExecutionError)
    }
}

/// Check the arguments object against the tool's declared parameters.
/// Undeclared keys are ignored; missing required or mistyped declared
/// parameters are rejected.
fn validate_arguments(tool: &Tool, arguments: &Value) -> AgentResult<()> {
    let object = match arguments {
        Value::Object(map) => map,
        Value::Null if tool.parameters.iter().all(|p| !p.required) => return Ok(()),
        _ => {
            return Err(AgentError::InvalidParameters(format!(
                "arguments for '{}' must be a JSON object",
                tool.name
            )))
        }
    };

    for parameter in &tool.parameters {
        match object.get(&parameter.name) {
            None | Some(Value::Null) => {
                if parameter.required {
                    return Err(AgentError::InvalidParameters(format!(
                        "missing required parameter '{}' for '{}'",
                        parameter.name, tool.name
                    )));
                }
            }
            Some(value) => {
                if !parameter.kind.matches(value) {
                    return Err(AgentError::InvalidParameters(format!(
                        "parameter '{}' for '{}' must be of type {}",
                        parameter.name,
                        tool.name,
                        parameter.kind.as_str()
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::{ParameterKind, ToolParameter};
    use serde_json::json;

    fn echo_spec() -> ToolSpec {
        let tool = Tool::new("echo", "Echoes back the input").with_parameter(ToolParameter::new(
            "message",
            ParameterKind::String,
            true,
            "Text to echo",
        ));
        ToolSpec::new(tool, |arguments| async move {
            Ok(arguments["message"].as_str().unwrap_or_default().to_string())
        })
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec()).unwrap();
        let err = registry.register(echo_spec()).unwrap_err();
        assert_eq!(err, AgentError::DuplicateTool("echo".to_string()));
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let registry = ToolRegistry::new();
        let err = registry.resolve("missing").unwrap_err();
        assert_eq!(err, AgentError::ToolNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec()).unwrap();

        let output = registry
            .dispatch(&ToolCall::new("echo", json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(output, "hi");
    }

    #[tokio::test]
    async fn test_dispatch_missing_required_parameter() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec()).unwrap();

        let err = registry
            .dispatch(&ToolCall::new("echo", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_dispatch_wrong_parameter_type() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec()).unwrap();

        let err = registry
            .dispatch(&ToolCall::new("echo", json!({"message": 42})))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_dispatch_handler_error_becomes_execution_error() {
        let mut registry = ToolRegistry::new();
        let tool = Tool::new("broken", "Always fails");
        registry
            .register(ToolSpec::new(tool, |_| async move {
                Err("disk on fire".to_string())
            }))
            .unwrap();

        let err = registry
            .dispatch(&ToolCall::new("broken", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::ExecutionError("disk on fire".to_string()));
    }

    #[tokio::test]
    async fn test_dispatch_ignores_undeclared_keys() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec()).unwrap();

        let output = registry
            .dispatch(&ToolCall::new(
                "echo",
                json!({"message": "hi", "stray": true}),
            ))
            .await
            .unwrap();
        assert_eq!(output, "hi");
    }

    #[test]
    fn test_schemas_in_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec()).unwrap();
        registry
            .register(ToolSpec::new(Tool::new("noop", "Does nothing"), |_| async {
                Ok(String::new())
            }))
            .unwrap();

        let names: Vec<String> = registry.schemas().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["echo", "noop"]);
    }
}
