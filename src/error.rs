//! Error types for the relay
//!
//! Most runtime failures (producer I/O errors, dead streaming clients,
//! undersized frames) are handled where they happen and only logged. The
//! types here cover what can escape to a caller: start-up configuration,
//! listener binding, and the optional extraction caps.

use std::fmt;
use std::io;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or listener I/O failure
    Io(io::Error),
    /// Invalid configuration value
    Config(ConfigError),
    /// Producer stream rejected by the extractor
    Extract(ExtractError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Extract(e) => write!(f, "Extraction error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Extract(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<ExtractError> for Error {
    fn from(e: ExtractError) -> Self {
        Error::Extract(e)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    InvalidValue { key: &'static str, value: String },
    /// Unknown framing mode name
    InvalidFramingMode(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value for {}: {:?}", key, value)
            }
            ConfigError::InvalidFramingMode(mode) => write!(
                f,
                "unknown framing mode {:?} (expected jpeg-markers or len-prefix)",
                mode
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Rejections raised when an optional extraction cap is configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Length header declared more bytes than `max_frame_bytes`
    FrameTooLarge { declared: usize, max: usize },
    /// Buffer holding a pending start marker grew past `max_pending_bytes`
    PendingTooLarge { buffered: usize, max: usize },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::FrameTooLarge { declared, max } => {
                write!(f, "declared frame length {} exceeds limit {}", declared, max)
            }
            ExtractError::PendingTooLarge { buffered, max } => write!(
                f,
                "pending frame buffered {} bytes without end marker (limit {})",
                buffered, max
            ),
        }
    }
}

impl std::error::Error for ExtractError {}
