use std::{fmt, path::PathBuf};

use crate::{
    config::{ConfigSource, Configuration, LoadedConfig},
    environment::{self, Environment, REQUIRED_CREDENTIALS},
    error::{CleanupFailure, Result, StepFailure, WorkflowError},
    plan::{self, RunPlan, RunRequest},
    runner::{CommandRunner, SystemRunner},
    steps::{Deepcast, NotionUpload, StepKind, Transcribe, run_step},
};

/// Where a run currently is. `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Transcribing,
    Deepcasting,
    Uploading,
    CleaningUp,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Transcribing => "transcribing",
            Stage::Deepcasting => "deepcasting",
            Stage::Uploading => "uploading",
            Stage::CleaningUp => "cleaning-up",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    /// Steps that ran to completion, in order.
    pub completed: Vec<StepKind>,
    /// Steps in the plan that were not run.
    pub skipped: Vec<StepKind>,
    /// Intermediate files left on disk.
    pub kept: Vec<PathBuf>,
    /// Intermediate files deleted during cleanup.
    pub removed: Vec<PathBuf>,
    pub cleanup_failures: Vec<CleanupFailure>,
}

pub struct WorkflowOrchestrator<R = SystemRunner> {
    loaded: LoadedConfig,
    env: Environment,
    runner: R,
}

impl WorkflowOrchestrator<SystemRunner> {
    pub fn new(loaded: LoadedConfig, env: Environment) -> Self {
        Self::with_runner(loaded, env, SystemRunner)
    }
}

impl<R: CommandRunner> WorkflowOrchestrator<R> {
    pub fn with_runner(loaded: LoadedConfig, env: Environment, runner: R) -> Self {
        Self {
            loaded,
            env,
            runner,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.loaded.config
    }

    pub fn source(&self) -> &ConfigSource {
        &self.loaded.source
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Validate credentials and resolve the run plan. Touches nothing on disk.
    pub fn plan(&self, request: &RunRequest) -> Result<RunPlan> {
        enter(Stage::Validating);
        environment::validate(&self.env, REQUIRED_CREDENTIALS)
            .and_then(|()| plan::resolve(request, &self.loaded.config, &self.env))
            .map_err(failed)
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunSummary> {
        let plan = self.plan(request)?;
        self.execute(&plan).await
    }

    /// Run the planned steps in order, stopping at the first failure.
    pub async fn execute(&self, plan: &RunPlan) -> Result<RunSummary> {
        if !plan.audio_file.exists() {
            return Err(failed(WorkflowError::AudioFileNotFound {
                path: plan.audio_file.clone(),
            }));
        }

        let mut completed = Vec::new();
        let mut skipped = Vec::new();
        let mut artifacts = Vec::new();

        let transcript = if plan.includes(StepKind::Transcribe) {
            enter(Stage::Transcribing);
            let step = Transcribe {
                audio_file: plan.audio_file.clone(),
                output_dir: plan.output_dir.clone(),
                working_dir: plan.working_dir.clone(),
            };
            run_step(&step, &self.runner).await.map_err(step_failed)?;
            let path = step.output_path();
            tracing::info!(file = %path.display(), "transcription completed");
            completed.push(StepKind::Transcribe);
            artifacts.push(path.clone());
            Some(path)
        } else {
            None
        };

        let deepcast = match (&transcript, plan.includes(StepKind::Deepcast)) {
            (Some(transcript), true) => {
                enter(Stage::Deepcasting);
                let step = Deepcast {
                    transcript: transcript.clone(),
                    output_dir: plan.output_dir.clone(),
                    model: plan.deepcast_model.clone(),
                    temperature: plan.deepcast_temperature,
                };
                run_step(&step, &self.runner).await.map_err(step_failed)?;
                let path = step.output_path();
                tracing::info!(file = %path.display(), "deepcast breakdown generated");
                completed.push(StepKind::Deepcast);
                artifacts.push(path.clone());
                Some(path)
            }
            (None, true) => {
                // Deepcast never reads raw audio.
                tracing::info!("skipping deepcast: transcription is not part of this workflow");
                skipped.push(StepKind::Deepcast);
                None
            }
            (_, false) => None,
        };

        if plan.includes(StepKind::NotionUpload) {
            enter(Stage::Uploading);
            let markdown_file = deepcast
                .as_ref()
                .or(transcript.as_ref())
                .unwrap_or(&plan.audio_file)
                .clone();
            let step = NotionUpload {
                markdown_file,
                title: plan.title.clone(),
                database_id: plan.database_id.clone(),
            };
            run_step(&step, &self.runner).await.map_err(step_failed)?;
            tracing::info!(title = %plan.title, "notion upload completed");
            completed.push(StepKind::NotionUpload);
        }

        let (kept, removed, cleanup_failures) = if plan.keep_files {
            (artifacts, Vec::new(), Vec::new())
        } else {
            enter(Stage::CleaningUp);
            let (removed, failures) = cleanup(artifacts).await;
            (Vec::new(), removed, failures)
        };

        enter(Stage::Done);
        Ok(RunSummary {
            output_dir: plan.output_dir.clone(),
            completed,
            skipped,
            kept,
            removed,
            cleanup_failures,
        })
    }
}

/// Delete each file independently; one failure does not stop the rest.
async fn cleanup(files: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<CleanupFailure>) {
    let mut removed = Vec::new();
    let mut failures = Vec::new();

    for path in files {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(file = %path.display(), "cleaned up");
                removed.push(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(file = %path.display(), "already gone");
            }
            Err(source) => {
                let failure = CleanupFailure { path, source };
                tracing::warn!("{failure}");
                failures.push(failure);
            }
        }
    }

    (removed, failures)
}

fn enter(stage: Stage) {
    tracing::info!(%stage, "entering stage");
}

fn failed(err: WorkflowError) -> WorkflowError {
    tracing::debug!(stage = %Stage::Failed, error = %err, "run aborted");
    err
}

fn step_failed(err: StepFailure) -> WorkflowError {
    failed(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::parse_config,
        environment::ORIGINAL_CWD_VAR,
        error::StepCause,
        steps::testing::{Behavior, FakeTools},
    };
    use std::{fs, path::Path};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        config: Configuration,
        env: Environment,
    }

    impl Fixture {
        fn new(yaml: &str) -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("meeting.mp3"), b"ID3").unwrap();
            let env = Environment::new("/")
                .with_var(ORIGINAL_CWD_VAR, dir.path().to_string_lossy())
                .with_var("OPENAI_API_KEY", "sk-test")
                .with_var("NOTION_API_KEY", "secret_test");
            Self {
                dir,
                config: parse_config(yaml).unwrap(),
                env,
            }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn orchestrator<'a>(&self, tools: &'a FakeTools) -> WorkflowOrchestrator<&'a FakeTools> {
            WorkflowOrchestrator::with_runner(
                LoadedConfig {
                    config: self.config.clone(),
                    source: ConfigSource::Defaults,
                },
                self.env.clone(),
                tools,
            )
        }
    }

    const BASIC: &str = "databases:\n  meetings: db-meetings\n";

    const PARTIAL: &str = r#"
databases:
  meetings: db-meetings
workflows:
  notes_only:
    steps: [deepcast, notion-upload]
  tuned:
    steps: [transcribe, deepcast, notion-upload]
    deepcast_model: gpt-4o-mini
    deepcast_temperature: 0.7
"#;

    fn upload_file(tools: &FakeTools) -> PathBuf {
        let uploads = tools.calls_to("notion-upload");
        assert_eq!(uploads.len(), 1);
        PathBuf::from(&uploads[0].args[0])
    }

    #[tokio::test]
    async fn default_workflow_runs_everything_and_cleans_up() {
        let fx = Fixture::new(BASIC);
        let tools = FakeTools::new();

        let summary = fx
            .orchestrator(&tools)
            .run(&RunRequest::new("meeting.mp3"))
            .await
            .unwrap();

        let programs: Vec<_> = tools.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(programs, ["transcribe", "deepcast", "notion-upload"]);
        assert_eq!(summary.completed, StepKind::ALL);

        let upload = &tools.calls_to("notion-upload")[0];
        assert_eq!(upload.flag_value("--title"), Some(Path::new("meeting")));
        assert_eq!(
            upload.flag_value("--database-id"),
            Some(Path::new("db-meetings"))
        );
        assert_eq!(
            upload_file(&tools),
            fx.path("meeting-transcript-deepcast.md")
        );

        assert_eq!(summary.output_dir, fx.dir.path());
        assert!(!fx.path("meeting-transcript.md").exists());
        assert!(!fx.path("meeting-transcript-deepcast.md").exists());
        assert!(fx.path("meeting.mp3").exists());
        assert_eq!(summary.removed.len(), 2);
        assert!(summary.cleanup_failures.is_empty());
    }

    #[tokio::test]
    async fn missing_notion_key_aborts_before_any_step() {
        let mut fx = Fixture::new(BASIC);
        fx.env = fx.env.with_var("NOTION_API_KEY", "");
        let tools = FakeTools::new();

        let err = fx
            .orchestrator(&tools)
            .run(&RunRequest::new("meeting.mp3"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::MissingCredentials { ref names } if names == &["NOTION_API_KEY"]
        ));
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_database_aborts_before_transcribe() {
        let fx = Fixture::new(BASIC);
        let tools = FakeTools::new();
        let request = RunRequest {
            database: Some("retro".into()),
            ..RunRequest::new("meeting.mp3")
        };

        let err = fx.orchestrator(&tools).run(&request).await.unwrap_err();

        assert!(matches!(err, WorkflowError::UnknownDatabase { .. }));
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_audio_file_aborts_before_any_step() {
        let fx = Fixture::new(BASIC);
        let tools = FakeTools::new();

        let err = fx
            .orchestrator(&tools)
            .run(&RunRequest::new("absent.wav"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::AudioFileNotFound { .. }));
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn deepcast_is_skipped_without_transcription() {
        let fx = Fixture::new(PARTIAL);
        let tools = FakeTools::new();
        let request = RunRequest {
            workflow: Some("notes_only".into()),
            ..RunRequest::new("meeting.mp3")
        };

        let summary = fx.orchestrator(&tools).run(&request).await.unwrap();

        assert!(tools.calls_to("deepcast").is_empty());
        assert_eq!(upload_file(&tools), fx.path("meeting.mp3"));
        assert_eq!(summary.skipped, [StepKind::Deepcast]);
        assert_eq!(summary.completed, [StepKind::NotionUpload]);
        assert!(fx.path("meeting.mp3").exists());
    }

    #[tokio::test]
    async fn workflow_settings_reach_deepcast() {
        let fx = Fixture::new(PARTIAL);
        let tools = FakeTools::new();
        let request = RunRequest {
            workflow: Some("tuned".into()),
            ..RunRequest::new("meeting.mp3")
        };

        fx.orchestrator(&tools).run(&request).await.unwrap();

        let deepcast = &tools.calls_to("deepcast")[0];
        assert_eq!(
            deepcast.flag_value("--model"),
            Some(Path::new("gpt-4o-mini"))
        );
        assert_eq!(deepcast.flag_value("--temperature"), Some(Path::new("0.7")));
    }

    #[tokio::test]
    async fn transcribe_runs_from_original_cwd() {
        let fx = Fixture::new(BASIC);
        let tools = FakeTools::new();

        fx.orchestrator(&tools)
            .run(&RunRequest::new("meeting.mp3"))
            .await
            .unwrap();

        let transcribe = &tools.calls_to("transcribe")[0];
        assert_eq!(transcribe.current_dir.as_deref(), Some(fx.dir.path()));
        assert_eq!(
            transcribe.args[0],
            fx.path("meeting.mp3").into_os_string()
        );
    }

    #[tokio::test]
    async fn zero_exit_without_output_stops_the_run() {
        let fx = Fixture::new(BASIC);
        let tools = FakeTools::new().behave("transcribe", Behavior::SkipOutput);

        let err = fx
            .orchestrator(&tools)
            .run(&RunRequest::new("meeting.mp3"))
            .await
            .unwrap_err();

        match err {
            WorkflowError::Step(failure) => {
                assert_eq!(failure.step, StepKind::Transcribe);
                assert!(matches!(failure.cause, StepCause::MissingOutput { .. }));
            }
            other => panic!("expected step failure, got {other:?}"),
        }
        assert!(tools.calls_to("deepcast").is_empty());
        assert!(tools.calls_to("notion-upload").is_empty());
    }

    #[tokio::test]
    async fn failed_step_leaves_completed_artifacts() {
        let fx = Fixture::new(BASIC);
        let tools = FakeTools::new().behave("deepcast", Behavior::Fail(1));

        let err = fx
            .orchestrator(&tools)
            .run(&RunRequest::new("meeting.mp3"))
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("deepcast step failed"));
        assert!(tools.calls_to("notion-upload").is_empty());
        assert!(fx.path("meeting-transcript.md").exists());
    }

    #[tokio::test]
    async fn keep_files_leaves_every_artifact() {
        let fx = Fixture::new(BASIC);
        let tools = FakeTools::new();
        let request = RunRequest {
            keep_files: Some(true),
            ..RunRequest::new("meeting.mp3")
        };

        let summary = fx.orchestrator(&tools).run(&request).await.unwrap();

        assert!(summary.removed.is_empty());
        assert_eq!(
            summary.kept,
            [
                fx.path("meeting-transcript.md"),
                fx.path("meeting-transcript-deepcast.md"),
            ]
        );
        assert!(fx.path("meeting-transcript.md").exists());
        assert!(fx.path("meeting-transcript-deepcast.md").exists());
    }

    #[tokio::test]
    async fn keep_files_default_comes_from_config() {
        let fx = Fixture::new("defaults:\n  keep_files: true\ndatabases:\n  meetings: db\n");
        let tools = FakeTools::new();

        let summary = fx
            .orchestrator(&tools)
            .run(&RunRequest::new("meeting.mp3"))
            .await
            .unwrap();

        assert_eq!(summary.kept.len(), 2);
        assert!(fx.path("meeting-transcript.md").exists());
    }

    #[tokio::test]
    async fn cleanup_failure_does_not_fail_the_run() {
        let fx = Fixture::new(BASIC);
        let tools = FakeTools::new().behave("transcribe", Behavior::OutputAsDirectory);

        let summary = fx
            .orchestrator(&tools)
            .run(&RunRequest::new("meeting.mp3"))
            .await
            .unwrap();

        assert_eq!(summary.cleanup_failures.len(), 1);
        assert_eq!(
            summary.cleanup_failures[0].path,
            fx.path("meeting-transcript.md")
        );
        assert_eq!(summary.removed, [fx.path("meeting-transcript-deepcast.md")]);
        assert!(!fx.path("meeting-transcript-deepcast.md").exists());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn stage_transitions_log_at_info() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || enter(Stage::Uploading));

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("INFO"), "{output}");
        assert!(output.contains("stage=uploading"), "{output}");
    }
}
