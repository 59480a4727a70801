//! Front-end configuration: optional RON file, then environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use engine_logging::{engine_info, LogDestination};
use log::LevelFilter;
use serde::Deserialize;
use taskboard_engine::EngineSettings;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "taskboard.ron";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Unset (or 0) means a stream may stay idle forever.
    pub stream_idle_timeout_secs: Option<u64>,
    pub log_level: String,
    pub log_destination: String,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            stream_idle_timeout_secs: None,
            log_level: "info".to_string(),
            log_destination: "terminal".to_string(),
            log_file: PathBuf::from("./taskboard.log"),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from `taskboard.ron` when present, then apply env overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = ron::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        engine_info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `TASKBOARD_*` overrides looked up through `lookup`.
    ///
    /// | Env Var                              | Field                      |
    /// |--------------------------------------|----------------------------|
    /// | `TASKBOARD_BASE_URL`                 | `base_url`                 |
    /// | `TASKBOARD_CONNECT_TIMEOUT_SECS`     | `connect_timeout_secs`     |
    /// | `TASKBOARD_REQUEST_TIMEOUT_SECS`     | `request_timeout_secs`     |
    /// | `TASKBOARD_STREAM_IDLE_TIMEOUT_SECS` | `stream_idle_timeout_secs` |
    /// | `TASKBOARD_LOG_LEVEL`                | `log_level`                |
    /// | `TASKBOARD_LOG_DESTINATION`          | `log_destination`          |
    pub fn with_overrides<F>(mut self, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("TASKBOARD_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(secs) = parse_var(&lookup, "TASKBOARD_CONNECT_TIMEOUT_SECS")? {
            self.connect_timeout_secs = secs;
        }
        if let Some(secs) = parse_var(&lookup, "TASKBOARD_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = parse_var(&lookup, "TASKBOARD_STREAM_IDLE_TIMEOUT_SECS")? {
            self.stream_idle_timeout_secs = Some(secs);
        }
        if let Some(level) = lookup("TASKBOARD_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(destination) = lookup("TASKBOARD_LOG_DESTINATION") {
            self.log_destination = destination;
        }
        Ok(self)
    }

    pub fn level_filter(&self) -> anyhow::Result<LevelFilter> {
        LevelFilter::from_str(self.log_level.trim())
            .map_err(|_| anyhow!("invalid log level '{}'", self.log_level))
    }

    pub fn destination(&self) -> anyhow::Result<LogDestination> {
        LogDestination::parse(&self.log_destination).ok_or_else(|| {
            anyhow!(
                "invalid log destination '{}' (expected file, terminal or both)",
                self.log_destination
            )
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            stream_idle_timeout: self
                .stream_idle_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

fn parse_var<F>(lookup: &F, key: &str) -> anyhow::Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{key} must be a whole number of seconds"))
        })
        .transpose()
}
