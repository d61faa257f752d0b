use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum PitwallError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("telemetry source unavailable after {attempts} attempts")]
    SourceUnavailable { attempts: u32 },
    #[error("failed to read replay {path}: {source}")]
    Replay {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("replay line {line}: {source}")]
    ReplayParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("session log i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("session log serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PitwallError>;
