use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// The monitor never starts ticking when one of these is returned.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Invalid washdown window '{input}': {reason}")]
    Washdown { input: String, reason: String },
    #[error("Failed to read configuration file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write configuration file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Which append-only stream a sink failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStream {
    Ticks,
    Episodes,
}

impl std::fmt::Display for SinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkStream::Ticks => write!(f, "ticks"),
            SinkStream::Episodes => write!(f, "episodes"),
        }
    }
}

/// A single record that could not be written. Never fatal to the simulation.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to open {stream} log {path:?}: {source}")]
    Open {
        stream: SinkStream,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to append to {stream} log: {source}")]
    Write {
        stream: SinkStream,
        #[source]
        source: std::io::Error,
    },
    #[error("{stream} sink rejected record: {reason}")]
    Rejected { stream: SinkStream, reason: String },
}

impl SinkError {
    pub fn stream(&self) -> SinkStream {
        match self {
            SinkError::Open { stream, .. }
            | SinkError::Write { stream, .. }
            | SinkError::Rejected { stream, .. } => *stream,
        }
    }
}
