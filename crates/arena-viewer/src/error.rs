use std::path::PathBuf;

/// Errors raised by the viewer host around the engine.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Event feed task failed: {0}")]
    FeedTask(String),

    #[error("Unknown page: {0}")]
    UnknownPage(String),

    #[error("No active task")]
    NoTask,
}
