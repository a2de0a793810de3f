//! Audio Workflow Core Library
//!
//! Resolves layered configuration and chains the external `transcribe`,
//! `deepcast` and `notion-upload` tools into a single run.

pub mod config;
pub mod environment;
pub mod error;
pub mod format;
pub mod paths;
pub mod plan;
pub mod runner;
pub mod steps;
pub mod workflow;

// Re-export commonly used items at crate root
pub use config::{ConfigSource, Configuration, LoadedConfig, WorkflowDefinition};
pub use environment::Environment;
pub use error::{CleanupFailure, ConfigError, Result, StepCause, StepFailure, WorkflowError};
pub use format::{format_config, format_databases, format_steps, format_workflows};
pub use plan::{RunPlan, RunRequest};
pub use runner::{CommandRunner, CommandSpec, SystemRunner, ToolExit};
pub use steps::StepKind;
pub use workflow::{RunSummary, Stage, WorkflowOrchestrator};
