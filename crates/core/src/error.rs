use std::path::PathBuf;

use thiserror::Error;

use crate::steps::StepKind;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Why an external tool did not do its job.
#[derive(Error, Debug)]
pub enum StepCause {
    #[error("could not start `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with code {code}")]
    ExitCode { command: String, code: i32 },

    #[error("`{command}` was terminated by a signal")]
    Terminated { command: String },

    #[error("`{command}` reported success but {path} was not created")]
    MissingOutput { command: String, path: PathBuf },
}

#[derive(Error, Debug)]
#[error("{step} step failed: {cause}")]
pub struct StepFailure {
    pub step: StepKind,
    #[source]
    pub cause: StepCause,
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Missing required environment variables: {}", names.join(", "))]
    MissingCredentials { names: Vec<String> },

    #[error(
        "No database ID found for '{name}' (add it under `databases:` or set {env_var} / NOTION_DATABASE_ID)"
    )]
    UnknownDatabase { name: String, env_var: String },

    #[error("Audio file not found: {path}")]
    AudioFileNotFound { path: PathBuf },

    #[error(transparent)]
    Step(#[from] StepFailure),
}

/// A leftover artifact that could not be removed. Never fails a run.
#[derive(Error, Debug)]
#[error("Could not clean up {path}: {source}")]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub source: std::io::Error,
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
