use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures an agent run can produce.
///
/// The registry variants (ToolNotFound, InvalidParameters, ExecutionError)
/// are recoverable: dispatch returns them as values and the run loop feeds
/// them back to the model as tool output. The rest terminate the run.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Provider request failed: {0}")]
    Provider(String),

    #[error("Tool loop exceeded {0} rounds without a final answer")]
    ToolLoopExceeded(usize),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Error surfaced by the orchestrator when a pipeline step fails.
///
/// Steps already yielded before the failure remain valid history; no agent
/// after the failing one runs.
#[derive(Error, Debug)]
#[error("agent '{agent}' failed: {source}")]
pub struct PipelineError {
    pub agent: String,
    #[source]
    pub source: AgentError,
}
