//! Ephemeral per-run workspace management.
//!
//! Each pipeline run owns exactly one workspace directory, created at run
//! start and destroyed unconditionally at run end. The workspace holds two
//! named artifact slots (`input.txt` and `output.txt`), plus an initial
//! binary slot (`input.pdf`) for runs whose first step consumes a document.
//! The directory is mounted into each task container at `/data`.
//!
//! The workspace is the sole owner of physical artifact paths; the sequencer
//! only moves slots through the operations below and never touches the
//! filesystem layout directly.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{ChainError, WorkspaceError};

/// Directory where the workspace is mounted inside task containers.
pub const CONTAINER_DATA_DIR: &str = "/data";
/// Text input slot, read by workers at `/data/input.txt`.
pub const INPUT_FILE: &str = "input.txt";
/// Output slot, written by workers at `/data/output.txt`.
pub const OUTPUT_FILE: &str = "output.txt";
/// Binary input slot for document-consuming first steps.
pub const BINARY_INPUT_FILE: &str = "input.pdf";

/// Initial content supplied by the caller for the first step.
#[derive(Debug, Clone)]
pub enum InitialArtifact {
    /// Inline text content.
    Text(String),
    /// Path to a binary document on the host.
    Document(PathBuf),
}

/// One run's exclusively-owned staging directory.
#[derive(Debug)]
pub struct Workspace {
    /// Kept as a value so the path stays printable after `destroy`.
    path: PathBuf,
    /// Present while the directory exists; `None` after `destroy`.
    dir: Option<TempDir>,
}

impl Workspace {
    /// Allocates a new, uniquely named workspace directory.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::CreateFailed` on I/O failure (disk full,
    /// permission denied).
    pub fn create() -> Result<Self, WorkspaceError> {
        let dir = tempfile::Builder::new()
            .prefix("pipeforge-run-")
            .tempdir()
            .map_err(|e| WorkspaceError::CreateFailed(e.to_string()))?;

        debug!(path = %dir.path().display(), "Created workspace");

        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    /// Host path of the workspace directory.
    pub fn host_dir(&self) -> &Path {
        &self.path
    }

    fn slot(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Stages the caller-supplied initial content into the appropriate input
    /// slot for the first step.
    ///
    /// When the first step consumes a document, a missing or non-binary
    /// artifact is an error. When it consumes text, absent content degrades
    /// to an empty-string input so malformed requests still run best-effort.
    pub fn stage_initial(
        &self,
        artifact: Option<&InitialArtifact>,
        wants_binary: bool,
    ) -> Result<(), WorkspaceError> {
        if wants_binary {
            let Some(InitialArtifact::Document(source)) = artifact else {
                return Err(WorkspaceError::MissingBinaryInput);
            };

            let target = self.slot(BINARY_INPUT_FILE);
            fs::copy(source, &target).map_err(|e| WorkspaceError::StageFailed {
                path: source.display().to_string(),
                message: e.to_string(),
            })?;
            debug!(source = %source.display(), "Staged binary input");
            return Ok(());
        }

        let text = match artifact {
            Some(InitialArtifact::Text(text)) => text.as_str(),
            Some(InitialArtifact::Document(path)) => {
                warn!(path = %path.display(), "First step expects text; ignoring document input");
                ""
            }
            None => "",
        };

        fs::write(self.slot(INPUT_FILE), text)?;
        Ok(())
    }

    /// Moves the current output slot into position as the next step's input
    /// slot. The move is atomic: once it completes the output slot no longer
    /// exists and the input slot holds identical bytes.
    ///
    /// # Errors
    ///
    /// Returns `ChainError` when the output slot does not exist, which
    /// signals the prior task silently produced nothing.
    pub fn promote_output_to_input(&self, step: &str) -> Result<(), ChainError> {
        let output = self.slot(OUTPUT_FILE);
        if !output.exists() {
            return Err(ChainError {
                step: step.to_string(),
            });
        }

        if let Err(e) = fs::rename(&output, self.slot(INPUT_FILE)) {
            warn!(step, error = %e, "Failed to promote output artifact");
            return Err(ChainError {
                step: step.to_string(),
            });
        }

        debug!(step, "Promoted output artifact to input slot");
        Ok(())
    }

    /// Reads the current input slot, or `None` if absent.
    pub fn read_input(&self) -> Result<Option<String>, WorkspaceError> {
        read_optional(&self.slot(INPUT_FILE))
    }

    /// Reads the current output slot, or `None` if absent.
    pub fn read_output(&self) -> Result<Option<String>, WorkspaceError> {
        read_optional(&self.slot(OUTPUT_FILE))
    }

    /// Removes the workspace directory. Idempotent; failures are logged, not
    /// raised, so cleanup can never mask the error that led here.
    pub fn destroy(&mut self) {
        if let Some(dir) = self.dir.take() {
            debug!(path = %self.path.display(), "Destroying workspace");
            if let Err(e) = dir.close() {
                warn!(path = %self.path.display(), error = %e, "Failed to remove workspace");
            }
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, WorkspaceError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(WorkspaceError::Io(e)),
    }
}
