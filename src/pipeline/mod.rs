//! Pipeline orchestration layer.
//!
//! One run moves through this lifecycle:
//! ```text
//! INIT → STAGING → (RUNNING_STEP → CHAINING)* → COLLECTING → SUCCEEDED/FAILED
//!                            CLEANUP on every path to a terminal state
//! ```

pub mod config;
pub mod sequencer;

pub use config::{ConfigError, PipelineConfig};
pub use sequencer::{PipelineRunner, RunOutcome};
