//! Pipeline sequencer: drives a validated plan through the workspace manager
//! and the task executor, chaining each step's output artifact into the next
//! step's input slot.
//!
//! One run moves through `INIT → STAGING → (RUNNING_STEP → CHAINING)* →
//! COLLECTING`, ending in either terminal outcome; the workspace is destroyed
//! on every path out. Execution is strictly sequential within a run, and
//! concurrent runs are independent: each owns a distinct workspace directory
//! and each executor invocation allocates a distinct container name.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{CollectionError, PipelineError};
use crate::executor::IsolatedExecutor;
use crate::params;
use crate::plan::{self, ValidatedPlan};
use crate::planner::Planner;
use crate::registry::{TaskDescriptor, TaskParam, TaskRegistry};
use crate::workspace::{InitialArtifact, Workspace};

use super::config::PipelineConfig;

/// Terminal value of one pipeline run. Exactly one field is populated.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final artifact content on success.
    pub output: Option<String>,
    /// Human-readable diagnostic on failure.
    pub error: Option<String>,
}

impl RunOutcome {
    fn succeeded(output: String) -> Self {
        Self {
            output: Some(output),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            output: None,
            error: Some(error),
        }
    }

    /// Returns true when the run produced a final artifact.
    pub fn is_success(&self) -> bool {
        self.output.is_some()
    }
}

/// Drives pipeline runs end to end: planning, validation, staging, step
/// execution, chaining, collection, and cleanup.
pub struct PipelineRunner {
    registry: TaskRegistry,
    planner: Arc<dyn Planner>,
    executor: Arc<dyn IsolatedExecutor>,
    config: PipelineConfig,
}

impl PipelineRunner {
    /// Creates a runner over the given capabilities.
    pub fn new(
        registry: TaskRegistry,
        planner: Arc<dyn Planner>,
        executor: Arc<dyn IsolatedExecutor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            planner,
            executor,
            config,
        }
    }

    /// Runs the pipeline for a request without external cancellation.
    pub async fn run(&self, request: &str, initial: Option<InitialArtifact>) -> RunOutcome {
        self.run_cancellable(request, initial, &CancellationToken::new())
            .await
    }

    /// Runs the pipeline, checking the cancellation token between steps.
    /// A running task is never interrupted; cancellation takes effect before
    /// the next step starts.
    pub async fn run_cancellable(
        &self,
        request: &str,
        initial: Option<InitialArtifact>,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        match self.run_inner(request, initial.as_ref(), cancel).await {
            Ok(output) => {
                info!("Pipeline finished successfully");
                RunOutcome::succeeded(output)
            }
            Err(error) => {
                let diagnostic = render_diagnostic(&error, self.config.diagnostic_limit);
                info!(error = %diagnostic, "Pipeline failed");
                RunOutcome::failed(diagnostic)
            }
        }
    }

    async fn run_inner(
        &self,
        request: &str,
        initial: Option<&InitialArtifact>,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        // INIT: plan and validate before any filesystem work, so empty or
        // unusable plans leave nothing behind.
        let raw_plan = self.planner.plan(request).await?;
        let validated = plan::validate(&raw_plan, &self.registry)?;

        info!(
            steps = %validated
                .steps()
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()
                .join(" -> "),
            "Executing plan"
        );

        // STAGING through COLLECTING happen against one workspace, destroyed
        // unconditionally on the way out.
        let mut workspace = Workspace::create()?;
        let result = self
            .execute_plan(&validated, request, initial, &workspace, cancel)
            .await;
        workspace.destroy();

        result
    }

    async fn execute_plan(
        &self,
        plan: &ValidatedPlan,
        request: &str,
        initial: Option<&InitialArtifact>,
        workspace: &Workspace,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        workspace.stage_initial(initial, plan.first().binary_input)?;

        let total = plan.len();
        for (index, step) in plan.steps().iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled {
                    step: step.id.clone(),
                });
            }

            info!(step = %step.id, number = index + 1, total, "Running step");

            let env = self.step_env(step, request);
            if let Err(source) = self.executor.run(step, workspace.host_dir(), &env).await {
                // Best-effort: a failing worker is expected to leave a
                // diagnostic message in its output slot.
                let diagnostic = workspace.read_output().ok().flatten();
                return Err(PipelineError::Execution {
                    step: step.id.clone(),
                    source,
                    diagnostic,
                });
            }

            // CHAINING: after every step but the last.
            if index + 1 < total {
                workspace.promote_output_to_input(&step.id)?;
            }
        }

        // COLLECTING
        let output = workspace.read_output()?.ok_or(CollectionError)?;
        debug!(bytes = output.len(), "Collected final artifact");
        Ok(output)
    }

    /// Derives the extra environment parameters a step declares.
    fn step_env(&self, step: &TaskDescriptor, request: &str) -> Vec<(String, String)> {
        let mut env = Vec::new();

        if step.requires_param(TaskParam::TargetLanguage) {
            let lang = params::target_language(request);
            info!(step = %step.id, lang, "Setting TARGET_LANG");
            env.push(("TARGET_LANG".to_string(), lang.to_string()));
        }

        env
    }
}

/// Renders a single human-readable diagnostic for the caller, bounding any
/// captured text to `limit` bytes.
fn render_diagnostic(error: &PipelineError, limit: usize) -> String {
    let rendered = error.to_string();
    let mut message = truncate_utf8(&rendered, limit).to_string();

    if let PipelineError::Execution {
        diagnostic: Some(partial),
        ..
    } = error
    {
        if !partial.trim().is_empty() {
            message.push_str("\nLast output from task:\n");
            message.push_str(truncate_utf8(partial, limit));
        }
    }

    message
}

/// Truncates to at most `limit` bytes without splitting a UTF-8 character.
fn truncate_utf8(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }

    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;

    #[test]
    fn test_truncate_utf8_short_text() {
        assert_eq!(truncate_utf8("hello", 500), "hello");
    }

    #[test]
    fn test_truncate_utf8_bounds_length() {
        let long = "x".repeat(1000);
        assert_eq!(truncate_utf8(&long, 500).len(), 500);
    }

    #[test]
    fn test_truncate_utf8_respects_char_boundaries() {
        // Each 'ü' is two bytes; an odd limit must not split one.
        let text = "ü".repeat(10);
        let truncated = truncate_utf8(&text, 5);
        assert_eq!(truncated.len(), 4);
        assert_eq!(truncated, "üü");
    }

    #[test]
    fn test_run_outcome_populates_exactly_one_field() {
        let ok = RunOutcome::succeeded("result".to_string());
        assert!(ok.is_success());
        assert!(ok.error.is_none());

        let failed = RunOutcome::failed("diagnostic".to_string());
        assert!(!failed.is_success());
        assert!(failed.output.is_none());
    }

    #[test]
    fn test_render_diagnostic_appends_partial_output() {
        let error = PipelineError::Execution {
            step: "summarizer-service".to_string(),
            source: ExecutionError::NonZeroExit {
                code: 1,
                stderr: String::new(),
            },
            diagnostic: Some("boom".to_string()),
        };

        let message = render_diagnostic(&error, 500);
        assert!(message.contains("summarizer-service"));
        assert!(message.contains("Last output from task"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_render_diagnostic_skips_empty_partial() {
        let error = PipelineError::Execution {
            step: "summarizer-service".to_string(),
            source: ExecutionError::Timeout { seconds: 300 },
            diagnostic: Some("   \n".to_string()),
        };

        let message = render_diagnostic(&error, 500);
        assert!(!message.contains("Last output from task"));
    }

    #[test]
    fn test_render_diagnostic_truncates_partial() {
        let error = PipelineError::Execution {
            step: "summarizer-service".to_string(),
            source: ExecutionError::NonZeroExit {
                code: 1,
                stderr: String::new(),
            },
            diagnostic: Some("y".repeat(2000)),
        };

        let message = render_diagnostic(&error, 500);
        // Error line plus separator plus bounded capture.
        assert!(message.len() < 700);
    }
}
