//! Turns a [`RunRequest`] into a fully resolved [`RunPlan`].
//!
//! Every field is resolved by its own ordered fallback chain:
//! explicit argument, then configuration, then environment, then a
//! built-in value.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{
    config::Configuration,
    environment::{Environment, FALLBACK_DATABASE_VAR},
    error::{Result, WorkflowError},
    steps::{StepKind, file_stem},
};

#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub audio_file: PathBuf,
    pub title: Option<String>,
    pub database: Option<String>,
    pub workflow: Option<String>,
    pub keep_files: Option<bool>,
}

impl RunRequest {
    pub fn new(audio_file: impl Into<PathBuf>) -> Self {
        Self {
            audio_file: audio_file.into(),
            ..Default::default()
        }
    }
}

/// Everything one run needs. Built once, never changed during the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunPlan {
    pub audio_file: PathBuf,
    pub title: String,
    pub database: String,
    pub database_id: String,
    pub workflow: String,
    pub steps: Vec<StepKind>,
    pub deepcast_model: Option<String>,
    pub deepcast_temperature: Option<f64>,
    pub keep_files: bool,
    pub output_dir: PathBuf,
    /// Directory the user started in; external tools that take relative
    /// paths run from here.
    pub working_dir: PathBuf,
}

impl RunPlan {
    pub fn includes(&self, step: StepKind) -> bool {
        self.steps.contains(&step)
    }
}

pub fn resolve(request: &RunRequest, config: &Configuration, env: &Environment) -> Result<RunPlan> {
    let original_cwd = env.original_cwd();
    let paths = config.resolve_paths(env);

    let database = request
        .database
        .clone()
        .unwrap_or_else(|| config.defaults.database.clone());
    let workflow = request
        .workflow
        .clone()
        .unwrap_or_else(|| config.defaults.workflow.clone());
    let keep_files = request.keep_files.unwrap_or(config.defaults.keep_files);
    let title = request
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| file_stem(&request.audio_file));

    let database_id = resolve_database_id(&database, config, env).ok_or_else(|| {
        WorkflowError::UnknownDatabase {
            env_var: database_env_var(&database),
            name: database.clone(),
        }
    })?;

    let definition = config.workflow(&workflow);
    let steps = resolve_steps(definition.and_then(|w| w.steps.as_deref()));

    Ok(RunPlan {
        audio_file: absolutize(&request.audio_file, &original_cwd),
        title,
        database,
        database_id,
        workflow,
        steps,
        deepcast_model: definition.and_then(|w| w.deepcast_model.clone()),
        deepcast_temperature: definition.and_then(|w| w.deepcast_temperature),
        keep_files,
        output_dir: paths.output_dir,
        working_dir: original_cwd,
    })
}

/// `databases[name]`, then `<NAME>_DATABASE_ID`, then `NOTION_DATABASE_ID`.
pub fn resolve_database_id(name: &str, config: &Configuration, env: &Environment) -> Option<String> {
    config
        .databases
        .get(name)
        .filter(|id| !id.is_empty())
        .cloned()
        .or_else(|| env.var(&database_env_var(name)).map(String::from))
        .or_else(|| env.var(FALLBACK_DATABASE_VAR).map(String::from))
}

pub fn database_env_var(name: &str) -> String {
    format!("{}_DATABASE_ID", name.to_uppercase())
}

/// Known step names in configured order; the full pipeline when none are
/// configured.
pub fn resolve_steps(configured: Option<&[String]>) -> Vec<StepKind> {
    let configured = match configured {
        Some(names) if !names.is_empty() => names,
        _ => return StepKind::ALL.to_vec(),
    };

    configured
        .iter()
        .filter_map(|name| match name.parse::<StepKind>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                tracing::warn!("{e}; ignoring");
                None
            }
        })
        .collect()
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
