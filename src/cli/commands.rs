//! CLI command definitions and handlers.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::executor::DockerExecutor;
use crate::pipeline::{PipelineConfig, PipelineRunner};
use crate::planner::LlmPlanner;
use crate::registry::TaskRegistry;
use crate::workspace::InitialArtifact;

/// LLM-planned pipeline orchestrator for containerized text-processing tasks.
#[derive(Debug, Parser)]
#[command(name = "pipeforge", version, about)]
pub struct Cli {
    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a pipeline for a natural-language request.
    Run {
        /// The task description, e.g. "Summarize this and translate to German".
        #[arg(long)]
        request: String,

        /// Inline text content to process.
        #[arg(long, conflicts_with_all = ["file", "pdf"])]
        text: Option<String>,

        /// Path to a text file to process.
        #[arg(long, conflicts_with = "pdf")]
        file: Option<PathBuf>,

        /// Path to a PDF document to process.
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Optional JSON file with extra task descriptors.
        #[arg(long)]
        registry: Option<PathBuf>,
    },

    /// List the registered tasks.
    Tasks {
        /// Optional JSON file with extra task descriptors.
        #[arg(long)]
        registry: Option<PathBuf>,
    },
}

/// Parses command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the parsed CLI command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run {
            request,
            text,
            file,
            pdf,
            registry,
        } => run_pipeline(request, text, file, pdf, registry).await,
        Commands::Tasks { registry } => {
            let registry = load_registry(registry)?;
            for descriptor in registry.descriptors() {
                println!("{:<32} {}", descriptor.id, descriptor.description);
            }
            Ok(())
        }
    }
}

fn load_registry(path: Option<PathBuf>) -> anyhow::Result<TaskRegistry> {
    match path {
        Some(path) => TaskRegistry::from_file(&path)
            .with_context(|| format!("Failed to load registry from {}", path.display())),
        None => Ok(TaskRegistry::builtin()),
    }
}

async fn run_pipeline(
    request: String,
    text: Option<String>,
    file: Option<PathBuf>,
    pdf: Option<PathBuf>,
    registry: Option<PathBuf>,
) -> anyhow::Result<()> {
    let registry = load_registry(registry)?;
    let config = PipelineConfig::from_env()?;

    let planner = Arc::new(LlmPlanner::from_env(&registry)?);
    let executor = Arc::new(DockerExecutor::new(
        config.worker_secret.clone(),
        config.step_timeout,
    )?);

    let initial = resolve_initial_artifact(text, file, pdf)?;
    let runner = PipelineRunner::new(registry, planner, executor, config);

    let outcome = runner.run(&request, initial).await;
    match (outcome.output, outcome.error) {
        (Some(output), _) => {
            println!("{output}");
            Ok(())
        }
        (None, Some(error)) => anyhow::bail!("Pipeline execution failed: {error}"),
        (None, None) => anyhow::bail!("Pipeline produced no outcome"),
    }
}

/// Resolves the initial artifact from the CLI inputs. With no explicit input,
/// text content is read from stdin.
fn resolve_initial_artifact(
    text: Option<String>,
    file: Option<PathBuf>,
    pdf: Option<PathBuf>,
) -> anyhow::Result<Option<InitialArtifact>> {
    if let Some(path) = pdf {
        return Ok(Some(InitialArtifact::Document(path)));
    }

    if let Some(text) = text {
        return Ok(Some(InitialArtifact::Text(text)));
    }

    if let Some(path) = file {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?;
        return Ok(Some(InitialArtifact::Text(contents)));
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read text content from stdin")?;

    if buffer.is_empty() {
        Ok(None)
    } else {
        Ok(Some(InitialArtifact::Text(buffer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::parse_from([
            "pipeforge",
            "run",
            "--request",
            "Summarize this",
            "--text",
            "some content",
        ]);

        match cli.command {
            Commands::Run { request, text, .. } => {
                assert_eq!(request, "Summarize this");
                assert_eq!(text.as_deref(), Some("some content"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_text_and_pdf_conflict() {
        let result = Cli::try_parse_from([
            "pipeforge",
            "run",
            "--request",
            "r",
            "--text",
            "t",
            "--pdf",
            "doc.pdf",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_inline_text() {
        let artifact = resolve_initial_artifact(Some("hello".to_string()), None, None)
            .unwrap()
            .unwrap();
        assert!(matches!(artifact, InitialArtifact::Text(text) if text == "hello"));
    }

    #[test]
    fn test_resolve_pdf_takes_precedence() {
        let artifact = resolve_initial_artifact(None, None, Some(PathBuf::from("doc.pdf")))
            .unwrap()
            .unwrap();
        assert!(matches!(artifact, InitialArtifact::Document(_)));
    }
}
