//! Adapters around the external tools a workflow chains together.
//!
//! Each adapter builds its command line deterministically from resolved
//! paths, and [`run_step`] executes it. A step succeeds only when the tool
//! exits with status 0 and its expected output file exists afterwards.

mod deepcast;
mod notion_upload;
mod transcribe;

use std::{fmt, path::PathBuf, str::FromStr};

use serde::Serialize;

pub use deepcast::Deepcast;
pub use notion_upload::NotionUpload;
pub use transcribe::Transcribe;

use crate::{
    error::{StepCause, StepFailure},
    runner::{CommandRunner, CommandSpec},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Transcribe,
    Deepcast,
    NotionUpload,
}

impl StepKind {
    pub const ALL: [StepKind; 3] = [
        StepKind::Transcribe,
        StepKind::Deepcast,
        StepKind::NotionUpload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Transcribe => "transcribe",
            StepKind::Deepcast => "deepcast",
            StepKind::NotionUpload => "notion-upload",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                format!("Unknown step: {s}. Available: transcribe, deepcast, notion-upload")
            })
    }
}

pub trait Step {
    const KIND: StepKind;

    fn command(&self) -> CommandSpec;

    /// File the tool must leave behind, if any.
    fn expected_output(&self) -> Option<PathBuf>;
}

/// Run one step through `runner`, returning the produced file (if the step
/// produces one).
pub async fn run_step<S, R>(step: &S, runner: &R) -> Result<Option<PathBuf>, StepFailure>
where
    S: Step,
    R: CommandRunner,
{
    let command = step.command();
    tracing::debug!(step = %S::KIND, command = %command, "running");

    let fail = |cause| StepFailure {
        step: S::KIND,
        cause,
    };

    let exit = runner.run(&command).await.map_err(|source| {
        fail(StepCause::Spawn {
            program: command.program.clone(),
            source,
        })
    })?;

    match exit.code {
        Some(0) => {}
        Some(code) => {
            return Err(fail(StepCause::ExitCode {
                command: command.to_string(),
                code,
            }));
        }
        None => {
            return Err(fail(StepCause::Terminated {
                command: command.to_string(),
            }));
        }
    }

    let output = step.expected_output();
    if let Some(path) = &output
        && !path.exists()
    {
        return Err(fail(StepCause::MissingOutput {
            command: command.to_string(),
            path: path.clone(),
        }));
    }

    Ok(output)
}

/// File stem as a string, falling back to the whole name.
pub(crate) fn file_stem(path: &std::path::Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
