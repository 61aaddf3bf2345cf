//! Platform layer errors.

use std::path::PathBuf;

use pointwarp_types::ScreenId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("could not connect to display server: {0}")]
    Connect(String),

    #[error("display server reported no screens")]
    NoScreens,

    #[error("file monitor is full ({capacity} paths)")]
    MonitorFull { capacity: usize },

    #[error("monitored path too long ({len} > {max} bytes): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    #[error("invalid mouse button {0} (expected 1-3)")]
    InvalidButton(u8),

    #[error("unknown screen {0}")]
    UnknownScreen(ScreenId),

    #[error("not supported by this backend: {0}")]
    NotSupported(&'static str),

    #[error("display protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    /// Errors after which the process cannot continue on defined state.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connect(_) | Self::NoScreens | Self::MonitorFull { .. } | Self::InvalidButton(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {field}: {source}")]
    Color {
        field: &'static str,
        #[source]
        source: pointwarp_types::ColorError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(PlatformError::Connect("no DISPLAY".into()).is_fatal());
        assert!(PlatformError::MonitorFull { capacity: 32 }.is_fatal());
        assert!(PlatformError::InvalidButton(9).is_fatal());
        assert!(!PlatformError::NotSupported("cursor hiding").is_fatal());
        assert!(!PlatformError::UnknownScreen(ScreenId(3)).is_fatal());
    }
}
