use std::path::PathBuf;

use super::{Step, StepKind, file_stem};
use crate::runner::CommandSpec;

/// `transcribe <audio> --output-dir <dir> --formats md`
#[derive(Debug, Clone)]
pub struct Transcribe {
    pub audio_file: PathBuf,
    pub output_dir: PathBuf,
    /// Where the tool runs; the directory the user started in.
    pub working_dir: PathBuf,
}

impl Transcribe {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}-transcript.md", file_stem(&self.audio_file)))
    }
}

impl Step for Transcribe {
    const KIND: StepKind = StepKind::Transcribe;

    fn command(&self) -> CommandSpec {
        CommandSpec::new("transcribe")
            .arg(&self.audio_file)
            .arg("--output-dir")
            .arg(&self.output_dir)
            .arg("--formats")
            .arg("md")
            .current_dir(&self.working_dir)
    }

    fn expected_output(&self) -> Option<PathBuf> {
        Some(self.output_path())
    }
}
