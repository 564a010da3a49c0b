//! Isolated task execution layer.
//!
//! A task runs to completion inside a container with no shared state beyond
//! the mounted workspace and injected parameters. The sequencer depends only
//! on the [`IsolatedExecutor`] capability so tests can substitute an
//! in-process fake.

pub mod docker;

use std::path::Path;

use async_trait::async_trait;

use crate::error::ExecutionError;
use crate::registry::TaskDescriptor;

pub use docker::DockerExecutor;

/// Outcome of one isolated task execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Process exit status of the containerized task.
    pub exit_code: i64,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ExecutionResult {
    /// Success means exit status zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability for running one task to completion in isolation.
///
/// Implementations mount `workspace_dir` at the well-known container data
/// path so the task can read its fixed-name input artifact and write its
/// fixed-name output artifact. They never inspect artifact contents; file
/// chaining belongs to the workspace manager.
#[async_trait]
pub trait IsolatedExecutor: Send + Sync {
    /// Runs the task, returning captured diagnostics on success.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` for a non-zero exit status, a timed-out run,
    /// a missing required credential, or an unavailable execution runtime.
    async fn run(
        &self,
        task: &TaskDescriptor,
        workspace_dir: &Path,
        env: &[(String, String)],
    ) -> Result<ExecutionResult, ExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_result_success() {
        let result = ExecutionResult {
            exit_code: 0,
            stdout: "done".to_string(),
            stderr: String::new(),
        };
        assert!(result.success());

        let failed = ExecutionResult {
            exit_code: 1,
            stdout: String::new(),
            stderr: "boom".to_string(),
        };
        assert!(!failed.success());
    }
}
