use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{DataManagerError, CONFIG_PATH, DATABASE_PATH};

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub database_path: PathBuf,
    pub persist_timeout: Duration,
    pub tick_interval: Duration,
    pub replay_interval: Duration,
    pub log_file: Option<PathBuf>,
    /// Keys present in the file but not understood. Loading runs before tracing is set up,
    /// so they are logged later by [`Configuration::warn_ignored_keys`].
    pub ignored_keys: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DATABASE_PATH),
            persist_timeout: Duration::from_millis(5000),
            tick_interval: Duration::from_millis(1000),
            replay_interval: Duration::from_millis(1000),
            log_file: None,
            ignored_keys: Vec::new(),
        }
    }
}

impl Configuration {
    /// Parses `key = value` lines. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, DataManagerError> {
        let mut config = Self::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(DataManagerError::Configuration(format!("Expected key = value, got: {}", line)));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "database_path" => config.database_path = PathBuf::from(value),
                "persist_timeout_ms" => config.persist_timeout = parse_millis(key, value)?,
                "tick_interval_ms" => config.tick_interval = parse_millis(key, value)?,
                "replay_interval_ms" => config.replay_interval = parse_millis(key, value)?,
                "log_file" => config.log_file = Some(PathBuf::from(value)),
                _ => config.ignored_keys.push(key.to_string()),
            }
        }

        if config.persist_timeout.is_zero() {
            return Err(DataManagerError::Configuration("persist_timeout_ms must be positive".into()));
        }

        Ok(config)
    }

    /// Reads `path`, or the default location under the project root. A missing default
    /// file means defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, DataManagerError> {
        let root = project_root()?;

        let mut config = match path {
            Some(path) => Self::parse(&read(path)?)?,
            None => {
                let default_path = root.join(CONFIG_PATH);
                if default_path.exists() {
                    Self::parse(&read(&default_path)?)?
                } else {
                    Self::default()
                }
            }
        };

        config.database_path = root.join(&config.database_path);
        config.log_file = config.log_file.map(|log_file| root.join(log_file));

        Ok(config)
    }

    pub fn warn_ignored_keys(&self) {
        for key in &self.ignored_keys {
            tracing::warn!("Unknown config key: {}", key);
        }
    }
}

pub(crate) fn project_root() -> Result<PathBuf, DataManagerError> {
    project_root::get_project_root()
        .map_err(|e| DataManagerError::Configuration(format!("Failed to find project root: {}", e)))
}

fn read(path: &Path) -> Result<String, DataManagerError> {
    std::fs::read_to_string(path)
        .map_err(|e| DataManagerError::Configuration(format!("Failed to read {:?}: {}", path, e)))
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, DataManagerError> {
    u64::from_str(value)
        .map(Duration::from_millis)
        .map_err(|_| DataManagerError::Configuration(format!("{} must be a whole number of milliseconds, got {}", key, value)))
}
