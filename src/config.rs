use std::{env, path::PathBuf, time::Duration};

use crate::constants::{
    DEFAULT_DOTNET_PATH, DEFAULT_KILL_GRACE_PERIOD, DEFAULT_OUTPUT_DRAIN_TIMEOUT,
    DEFAULT_PYTHON_PATH, DEFAULT_TIMEOUT, SCRATCH_DIR_NAME,
};

pub const SCRATCH_ROOT_VAR: &str = "CODERUNNER_SCRATCH_ROOT";
pub const PYTHON_PATH_VAR: &str = "CODERUNNER_PYTHON_PATH";
pub const DOTNET_PATH_VAR: &str = "CODERUNNER_DOTNET_PATH";
pub const TIMEOUT_MS_VAR: &str = "CODERUNNER_TIMEOUT_MS";
pub const KILL_GRACE_MS_VAR: &str = "CODERUNNER_KILL_GRACE_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid number in {var}: {value:?}")]
    InvalidNumber { var: String, value: String },
}

#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Parent directory of every per-execution workspace.
    pub scratch_root: PathBuf,
    pub python_path: PathBuf,
    pub dotnet_path: PathBuf,
    pub default_timeout: Duration,
    /// How long to wait for the OS to reap a killed process group.
    pub kill_grace_period: Duration,
    pub output_drain_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scratch_root: env::temp_dir().join(SCRATCH_DIR_NAME),
            python_path: DEFAULT_PYTHON_PATH.into(),
            dotnet_path: DEFAULT_DOTNET_PATH.into(),
            default_timeout: DEFAULT_TIMEOUT,
            kill_grace_period: DEFAULT_KILL_GRACE_PERIOD,
            output_drain_timeout: DEFAULT_OUTPUT_DRAIN_TIMEOUT,
        }
    }
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(root) = lookup(SCRATCH_ROOT_VAR) {
            config.scratch_root = root.into();
        }
        if let Some(path) = lookup(PYTHON_PATH_VAR) {
            config.python_path = path.into();
        }
        if let Some(path) = lookup(DOTNET_PATH_VAR) {
            config.dotnet_path = path.into();
        }
        if let Some(ms) = lookup(TIMEOUT_MS_VAR) {
            config.default_timeout = parse_millis(TIMEOUT_MS_VAR, &ms)?;
        }
        if let Some(ms) = lookup(KILL_GRACE_MS_VAR) {
            config.kill_grace_period = parse_millis(KILL_GRACE_MS_VAR, &ms)?;
        }

        Ok(config)
    }

    pub fn with_scratch_root<P: Into<PathBuf>>(self, scratch_root: P) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            ..self
        }
    }
}

fn parse_millis(var: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidNumber {
            var: var.to_string(),
            value: value.to_string(),
        })
}
