//! Viewer configuration, read from a TOML file.
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [feed]
//! channel_capacity = 256
//!
//! [simulation]
//! games = 3
//! max_steps = 30
//! seed = 7
//! solver_lag = 2
//! max_paths = 5
//! ```
//!
//! Every key is optional. A missing file at the default location means
//! defaults; a missing file named explicitly is an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use arena_protocol::DEFAULT_MAX_STEPS;

use crate::ViewerError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub log: LogConfig,
    pub feed: FeedConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Events buffered between the reader and the engine.
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { channel_capacity: 256 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub games: usize,
    pub max_steps: u32,
    /// Fixed seed for reproducible runs; entropy when absent.
    pub seed: Option<u64>,
    /// Moves a game makes before the solver answers for a page.
    pub solver_lag: u32,
    /// Paths returned per solver answer.
    pub max_paths: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            games: 3,
            max_steps: DEFAULT_MAX_STEPS,
            seed: None,
            solver_lag: 1,
            max_paths: 5,
        }
    }
}

impl ViewerConfig {
    /// `<config dir>/arena-viewer/viewer.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("arena-viewer").join("viewer.toml"))
    }

    pub fn from_toml(raw: &str) -> Result<Self, ViewerError> {
        let config: ViewerConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ViewerError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ViewerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Load `explicit` if given, else the default location if it exists,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ViewerError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "Loading viewer config");
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ViewerError> {
        if self.feed.channel_capacity == 0 {
            return Err(ViewerError::InvalidConfig(
                "feed.channel_capacity must be at least 1".into(),
            ));
        }
        if self.simulation.games == 0 {
            return Err(ViewerError::InvalidConfig("simulation.games must be at least 1".into()));
        }
        if self.simulation.max_steps == 0 {
            return Err(ViewerError::InvalidConfig(
                "simulation.max_steps must be at least 1".into(),
            ));
        }
        if self.log.level.trim().is_empty() {
            return Err(ViewerError::InvalidConfig("log.level must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_defaults() {
        let config = ViewerConfig::from_toml("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.simulation.max_steps, DEFAULT_MAX_STEPS);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = ViewerConfig::from_toml("[simulation]\nseed = 42\n").unwrap();
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.games, 3);
        assert_eq!(config.feed.channel_capacity, 256);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ViewerConfig::from_toml("[feed]\nchannel_capacity = 0\n").unwrap_err();
        assert!(matches!(err, ViewerError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_games_rejected() {
        let err = ViewerConfig::from_toml("[simulation]\ngames = 0\n").unwrap_err();
        assert!(matches!(err, ViewerError::InvalidConfig(_)));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = ViewerConfig::from_toml("[feed\n").unwrap_err();
        assert!(matches!(err, ViewerError::Toml(_)));
    }
}
