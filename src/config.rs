//! Config file and settings resolution
//!
//! Precedence: command line flags, then the config file, then built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use dblogs_collect::WorkloadInfo;

/// Label selector used when neither the flag nor the config names one
pub const DEFAULT_SELECTOR: &str = "app=hbase";

/// Seconds a log stream may stay silent before it is abandoned (0 disables)
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "DBLOGS_CONFIG";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Kubernetes context to use instead of the kubeconfig's current one
    pub context: Option<String>,

    /// Default pod label selector
    pub selector: Option<String>,

    pub idle_timeout_secs: Option<u64>,

    pub max_concurrency: Option<usize>,

    /// Label selector restricting which namespaces are offered as databases
    pub namespace_selector: Option<String>,

    /// Databases whose namespace differs from their name
    pub workloads: Vec<WorkloadEntry>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadEntry {
    pub name: String,
    pub namespace: String,
}

impl Config {
    /// `<config dir>/dblogs/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dblogs").join("config.toml"))
    }

    /// Load the config file.
    ///
    /// An explicitly named file (flag or environment) must exist; the default
    /// location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);

        if let Some(path) = explicit.map(Path::to_path_buf).or(env_path) {
            return Self::read(&path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn workload_catalog(&self) -> Vec<WorkloadInfo> {
        self.workloads
            .iter()
            .map(|w| WorkloadInfo::new(w.name.clone(), w.namespace.clone()))
            .collect()
    }
}

/// Flag values that can override the config file
#[derive(Debug, Default)]
pub struct Overrides {
    pub database_name: Option<String>,
    pub selector: Option<String>,
    pub all: bool,
    pub directory: PathBuf,
    pub context: Option<String>,
    pub idle_timeout_secs: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub no_prompt: bool,
}

/// Effective settings for one `logs` run
#[derive(Debug, PartialEq, Eq)]
pub struct Settings {
    pub database_name: Option<String>,
    pub selector: String,
    pub directory: PathBuf,
    pub context: Option<String>,
    pub idle_timeout: Option<Duration>,
    pub max_concurrency: Option<usize>,

    /// Whether the interactive database chooser may be used
    pub interactive: bool,
}

impl Settings {
    pub fn resolve(flags: Overrides, config: &Config, stdin_is_terminal: bool) -> Self {
        let selector = if flags.all {
            String::new()
        } else {
            flags
                .selector
                .or_else(|| config.selector.clone())
                .unwrap_or_else(|| DEFAULT_SELECTOR.to_string())
        };

        let timeout_secs = flags
            .idle_timeout_secs
            .or(config.idle_timeout_secs)
            .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS);

        Self {
            database_name: flags.database_name,
            selector,
            directory: flags.directory,
            context: flags.context.or_else(|| config.context.clone()),
            idle_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_concurrency: flags
                .max_concurrency
                .or(config.max_concurrency)
                .filter(|n| *n > 0),
            interactive: stdin_is_terminal && !flags.no_prompt,
        }
    }
}
