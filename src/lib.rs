//! pipeforge: LLM-planned pipeline orchestrator.
//!
//! Accepts a natural-language task description and a body of text (or a PDF
//! document), obtains an ordered plan of processing steps from an LLM
//! planner, and executes the plan as a chain of isolated container runs,
//! each consuming the previous step's output artifact as its input.

// Core modules
pub mod cli;
pub mod error;
pub mod executor;
pub mod params;
pub mod pipeline;
pub mod plan;
pub mod planner;
pub mod registry;
pub mod workspace;

// Re-export commonly used error types
pub use error::{
    ChainError, CollectionError, EmptyPlanError, ExecutionError, PipelineError, PlanningError,
    RegistryError, WorkspaceError,
};
