//! Error types for pipeforge operations.
//!
//! Defines error types for the major subsystems:
//! - Plan generation and validation
//! - Workspace lifecycle and artifact chaining
//! - Isolated task execution
//! - Pipeline sequencing

use thiserror::Error;

/// Errors that can occur while obtaining a plan from the planner.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("Missing API base URL: LLM_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Planner returned an empty response")]
    EmptyResponse,

    #[error("Failed to parse planner response: {0}")]
    ParseError(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// The raw plan contained no actionable steps after filtering.
#[derive(Debug, Error)]
pub enum EmptyPlanError {
    #[error("Plan is empty")]
    NoSteps,

    #[error("Plan contains no known tasks (unknown: {0})")]
    NoKnownSteps(String),
}

/// Errors that can occur while loading the task registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate task id '{0}' in registry")]
    DuplicateTask(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur managing the per-run workspace directory.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Failed to create workspace directory: {0}")]
    CreateFailed(String),

    #[error("Task requires a binary input document but none was supplied")]
    MissingBinaryInput,

    #[error("Failed to stage input document '{path}': {message}")]
    StageFailed { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The expected output artifact was missing when chaining to the next step.
#[derive(Debug, Error)]
#[error("Output artifact missing after step '{step}'")]
pub struct ChainError {
    pub step: String,
}

/// The final output artifact was missing after the last step.
#[derive(Debug, Error)]
#[error("Final output artifact is missing after the last step")]
pub struct CollectionError;

/// Errors that can occur running a single isolated task.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Missing credential: task '{task}' requires a secret but none is configured")]
    MissingCredential { task: String },

    #[error("Execution runtime not available: {0}")]
    RuntimeUnavailable(String),

    #[error("Container launch failed: {0}")]
    LaunchFailed(String),

    #[error("Task exited with non-zero code {code}: {stderr}")]
    NonZeroExit { code: i64, stderr: String },

    #[error("Task execution timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

/// Top-level error for one pipeline run, aggregating the subsystem kinds.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("No actionable steps: {0}")]
    EmptyPlan(#[from] EmptyPlanError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Step '{step}' failed: {source}")]
    Execution {
        step: String,
        #[source]
        source: ExecutionError,
        /// Best-effort content of the output slot at failure time.
        diagnostic: Option<String>,
    },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error("Run cancelled before step '{step}'")]
    Cancelled { step: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_display() {
        let err = ExecutionError::MissingCredential {
            task: "translator-service".to_string(),
        };
        assert!(err.to_string().contains("Missing credential"));
        assert!(err.to_string().contains("translator-service"));

        let err = ExecutionError::NonZeroExit {
            code: 1,
            stderr: "boom".to_string(),
        };
        assert!(err.to_string().contains("non-zero code 1"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_chain_error_names_step() {
        let err = ChainError {
            step: "summarizer-service".to_string(),
        };
        assert!(err.to_string().contains("summarizer-service"));
    }

    #[test]
    fn test_pipeline_error_wraps_execution() {
        let err = PipelineError::Execution {
            step: "translator-service".to_string(),
            source: ExecutionError::Timeout { seconds: 300 },
            diagnostic: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("translator-service"));
        assert!(msg.contains("failed"));
    }

    #[test]
    fn test_empty_plan_error_display() {
        assert!(EmptyPlanError::NoSteps.to_string().contains("empty"));
        let err = EmptyPlanError::NoKnownSteps("foo, bar".to_string());
        assert!(err.to_string().contains("foo, bar"));
    }
}
