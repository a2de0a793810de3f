//! Configuration discovery and loading.
//!
//! A single YAML document is loaded from the first location that exists.
//! Nothing is merged across locations, and a broken file degrades to the
//! built-in defaults instead of aborting.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

use crate::{
    environment::{CONFIG_PATH_VAR, Environment},
    error::ConfigError,
    paths::{self, ResolvedPaths},
};

const PROJECT_CONFIG_NAME: &str = "audio-workflow.yaml";
const GENERIC_CONFIG_NAME: &str = "config.yaml";
const USER_CONFIG_DIR: &str = ".config";
const CONFIG_DIR_NAME: &str = "audio-workflow";
const HOME_CONFIG_NAME: &str = ".audio-workflow.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default, deserialize_with = "database_ids")]
    pub databases: BTreeMap<String, String>,

    #[serde(default)]
    pub workflows: BTreeMap<String, WorkflowDefinition>,
}

/// Notion ids are strings, but YAML reads an all-digit id as a number.
fn database_ids<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_yaml::Value>>::deserialize(deserializer)?;

    raw.unwrap_or_default()
        .into_iter()
        .map(|(name, value)| {
            let id = match value {
                serde_yaml::Value::String(id) => id,
                serde_yaml::Value::Number(id) => id.to_string(),
                serde_yaml::Value::Bool(id) => id.to_string(),
                serde_yaml::Value::Null => String::new(),
                _ => {
                    return Err(D::Error::custom(format!(
                        "database `{name}` must map to an id string"
                    )));
                }
            };
            Ok((name, id))
        })
        .collect()
}

/// `defaults:` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub output_dir: String,
    pub temp_dir: String,
    pub database: String,
    pub workflow: String,
    pub keep_files: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output_dir: ".".into(),
            temp_dir: "/tmp".into(),
            database: "meetings".into(),
            workflow: "quick_notes".into(),
            keep_files: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub description: Option<String>,

    /// Step names in execution order. `None` or empty means the full pipeline.
    #[serde(default)]
    pub steps: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepcast_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepcast_temperature: Option<f64>,
}

impl Configuration {
    pub fn workflow(&self, name: &str) -> Option<&WorkflowDefinition> {
        self.workflows.get(name)
    }

    /// Output and temp directories resolved for this environment.
    pub fn resolve_paths(&self, env: &Environment) -> ResolvedPaths {
        paths::resolve(
            &self.defaults.output_dir,
            &self.defaults.temp_dir,
            &env.original_cwd(),
            &env.current_dir,
        )
    }
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Discovered(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(path) => write!(f, "{}", path.display()),
            ConfigSource::Discovered(path) => write!(f, "{} (auto-discovered)", path.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Configuration,
    pub source: ConfigSource,
}

/// Candidate locations, highest priority first.
pub fn candidate_paths(env: &Environment) -> Vec<PathBuf> {
    let original_cwd = env.original_cwd();

    [
        Some(original_cwd.join(PROJECT_CONFIG_NAME)),
        Some(original_cwd.join(GENERIC_CONFIG_NAME)),
        env.home_dir.as_deref().map(user_config_path),
        env.home_dir.as_ref().map(|home| home.join(HOME_CONFIG_NAME)),
        env.var(CONFIG_PATH_VAR).map(PathBuf::from),
        env.program_dir
            .as_ref()
            .map(|dir| dir.join(GENERIC_CONFIG_NAME)),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// `~/.config/audio-workflow/config.yaml`, on every platform.
fn user_config_path(home: &Path) -> PathBuf {
    home.join(USER_CONFIG_DIR)
        .join(CONFIG_DIR_NAME)
        .join(GENERIC_CONFIG_NAME)
}

/// Where a user can put a configuration file, as shown when none is found.
fn missing_config_hint() -> String {
    format!(
        "create one of: ./{PROJECT_CONFIG_NAME}, ~/{HOME_CONFIG_NAME}, {}, or set {CONFIG_PATH_VAR}",
        user_config_path(Path::new("~")).display()
    )
}

/// Resolve the configuration for this run.
///
/// An explicit path is loaded as-is; otherwise the first existing candidate
/// wins. Load failures are logged and yield an empty configuration.
pub fn resolve(explicit: Option<&Path>, env: &Environment) -> LoadedConfig {
    if let Some(path) = explicit {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            env.original_cwd().join(path)
        };
        let config = load_or_default(&path);
        return LoadedConfig {
            config,
            source: ConfigSource::Explicit(path),
        };
    }

    if let Some(path) = candidate_paths(env).into_iter().find(|p| p.is_file()) {
        tracing::info!(path = %path.display(), "using configuration");
        let config = load_or_default(&path);
        return LoadedConfig {
            config,
            source: ConfigSource::Discovered(path),
        };
    }

    tracing::warn!("no configuration file found, using defaults");
    tracing::warn!("{}", missing_config_hint());

    LoadedConfig {
        config: Configuration::default(),
        source: ConfigSource::Defaults,
    }
}

fn load_or_default(path: &Path) -> Configuration {
    load_config_from(path).unwrap_or_else(|e| {
        tracing::warn!("{e}");
        Configuration::default()
    })
}

/// Load a configuration document from a specific file.
pub fn load_config_from(path: &Path) -> Result<Configuration, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a YAML document. An empty document is an empty configuration.
pub fn parse_config(content: &str) -> Result<Configuration, serde_yaml::Error> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    if value.is_null() {
        return Ok(Configuration::default());
    }
    serde_yaml::from_value(value)
}
