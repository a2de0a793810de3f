use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

/// A fully built external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Value following `flag`, if present.
    pub fn flag_value(&self, flag: &str) -> Option<&Path> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(Path::new)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// How an external tool finished. `code` is `None` when killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    pub code: Option<i32>,
}

impl ToolExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner {
    /// Run the command to completion and report how it exited.
    async fn run(&self, command: &CommandSpec) -> std::io::Result<ToolExit>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    async fn run(&self, command: &CommandSpec) -> std::io::Result<ToolExit> {
        (**self).run(command).await
    }
}

/// Runs commands as child processes sharing the caller's terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> std::io::Result<ToolExit> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().await?;
        Ok(ToolExit {
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let cmd = CommandSpec::new("notion-upload")
            .arg("notes.md")
            .arg("--title")
            .arg("Weekly sync");
        assert_eq!(cmd.to_string(), "notion-upload notes.md --title Weekly sync");
    }

    #[test]
    fn flag_value_reads_next_argument() {
        let cmd = CommandSpec::new("deepcast")
            .arg("in.md")
            .arg("--output-path")
            .arg("/out/in-deepcast.md");
        assert_eq!(
            cmd.flag_value("--output-path"),
            Some(Path::new("/out/in-deepcast.md"))
        );
        assert_eq!(cmd.flag_value("--model"), None);
        assert!(!cmd.has_flag("--temperature"));
    }

    #[tokio::test]
    async fn system_runner_reports_exit_codes() {
        let ok = SystemRunner.run(&CommandSpec::new("true")).await.unwrap();
        assert!(ok.success());

        let failed = SystemRunner
            .run(&CommandSpec::new("sh").arg("-c").arg("exit 7"))
            .await
            .unwrap();
        assert_eq!(failed.code, Some(7));
        assert!(!failed.success());
    }

    #[tokio::test]
    async fn system_runner_surfaces_spawn_errors() {
        let err = SystemRunner
            .run(&CommandSpec::new("audio-workflow-no-such-tool"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
