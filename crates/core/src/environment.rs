//! Explicit snapshot of the process environment.
//!
//! Everything below the CLI takes an [`Environment`] instead of reading
//! `std::env` directly, so the original working directory and credentials
//! can be threaded through resolvers and swapped out in tests.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::error::{Result, WorkflowError};

/// Carries the directory the user started in across re-invocations.
pub const ORIGINAL_CWD_VAR: &str = "AUDIO_WORKFLOW_ORIGINAL_CWD";
/// Names an override configuration file.
pub const CONFIG_PATH_VAR: &str = "AUDIO_WORKFLOW_CONFIG";
/// Database id used when no per-database id is known.
pub const FALLBACK_DATABASE_VAR: &str = "NOTION_DATABASE_ID";

/// Credentials every workflow run needs before any step executes.
pub const REQUIRED_CREDENTIALS: &[&str] = &["OPENAI_API_KEY", "NOTION_API_KEY"];

#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub home_dir: Option<PathBuf>,
    pub program_dir: Option<PathBuf>,
}

impl Environment {
    /// Capture the real process environment.
    pub fn capture() -> std::io::Result<Self> {
        let current_dir = std::env::current_dir()?;
        let program_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        Ok(Self {
            vars: std::env::vars().collect(),
            current_dir,
            home_dir: dirs::home_dir(),
            program_dir,
        })
    }

    /// An environment with only a working directory; everything else unset.
    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: current_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    pub fn with_program_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.program_dir = Some(dir.into());
        self
    }

    /// Value of a variable; empty values count as unset.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The directory the user invoked the tool from.
    pub fn original_cwd(&self) -> PathBuf {
        self.var(ORIGINAL_CWD_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| self.current_dir.clone())
    }
}

/// Check that every named credential is present. Validity is not checked.
pub fn validate(env: &Environment, required: &[&str]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| env.var(name).is_none())
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::MissingCredentials { names: missing })
    }
}
