use std::path::PathBuf;

use super::{Step, StepKind, file_stem};
use crate::runner::CommandSpec;

/// `deepcast <transcript> --output-path <file> [--model m] [--temperature t]`
///
/// Model and temperature are only passed when the workflow sets them, so the
/// tool's own defaults apply otherwise.
#[derive(Debug, Clone)]
pub struct Deepcast {
    pub transcript: PathBuf,
    pub output_dir: PathBuf,
    pub model: Option<String>,
    pub temperature: Option<f64>,
}

impl Deepcast {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}-deepcast.md", file_stem(&self.transcript)))
    }
}

impl Step for Deepcast {
    const KIND: StepKind = StepKind::Deepcast;

    fn command(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new("deepcast")
            .arg(&self.transcript)
            .arg("--output-path")
            .arg(self.output_path());

        if let Some(model) = &self.model {
            cmd = cmd.arg("--model").arg(model);
        }
        if let Some(temperature) = self.temperature {
            cmd = cmd.arg("--temperature").arg(temperature.to_string());
        }
        cmd
    }

    fn expected_output(&self) -> Option<PathBuf> {
        Some(self.output_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn step(model: Option<&str>, temperature: Option<f64>) -> Deepcast {
        Deepcast {
            transcript: "/notes/meeting-transcript.md".into(),
            output_dir: "/notes".into(),
            model: model.map(String::from),
            temperature,
        }
    }

    #[test]
    fn output_is_named_after_input_stem() {
        assert_eq!(
            step(None, None).expected_output(),
            Some(PathBuf::from("/notes/meeting-transcript-deepcast.md"))
        );
    }

    #[test]
    fn tool_defaults_apply_without_workflow_settings() {
        let cmd = step(None, None).command();
        assert_eq!(
            cmd.args,
            [
                "/notes/meeting-transcript.md",
                "--output-path",
                "/notes/meeting-transcript-deepcast.md",
            ]
            .map(OsString::from)
        );
    }

    #[test]
    fn forwards_model_and_temperature() {
        let cmd = step(Some("gpt-4o"), Some(0.3)).command();
        assert_eq!(cmd.flag_value("--model").unwrap().to_str(), Some("gpt-4o"));
        assert_eq!(
            cmd.flag_value("--temperature").unwrap().to_str(),
            Some("0.3")
        );
    }

    #[test]
    fn forwards_temperature_alone() {
        let cmd = step(None, Some(1.0)).command();
        assert!(!cmd.has_flag("--model"));
        assert_eq!(cmd.flag_value("--temperature").unwrap().to_str(), Some("1"));
    }
}
