//! Error types for the video editing server.
//!
//! A single `thiserror` hierarchy shared by the tool layer, the object store
//! and the media engine.
//!
//! # Error Categories
//!
//! - `Error::Validation`: caller-supplied argument violates a precondition
//! - `ResolutionError`: an input path or object reference cannot be resolved
//! - `Error::Engine`: decode/filter/encode failures reported by the media engine
//! - `Error::Io`: file system operations
//! - `ConfigError`: invalid configuration values

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the video editing server.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// An input identifier could not be resolved to a clip
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Media engine failures (probe, filter graph, encode)
    #[error("Engine error: {0}")]
    Engine(String),

    /// File system I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```
    /// use video_edit_mcp_common::error::Error;
    ///
    /// let err = Error::validation("end_time must be greater than start_time");
    /// assert!(err.to_string().contains("end_time"));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Create a new media engine error.
    ///
    /// # Example
    ///
    /// ```
    /// use video_edit_mcp_common::error::Error;
    ///
    /// let err = Error::engine("Unknown encoder 'libx265'");
    /// assert!(err.to_string().contains("libx265"));
    /// ```
    pub fn engine(message: impl Into<String>) -> Self {
        Error::Engine(message.into())
    }

    /// Stable category name reported to callers as `error_type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "ConfigError",
            Error::Validation(_) => "ValidationError",
            Error::Resolution(_) => "ResolutionError",
            Error::Engine(_) => "EngineError",
            Error::Io(_) => "IoError",
        }
    }

    /// Whether the error is a caller mistake rather than a system fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}

/// Failures to turn an input identifier into a live clip.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The reference was never issued or has been released
    #[error("Unknown object reference: {0}")]
    UnknownReference(String),

    /// The reference exists but holds something other than a clip
    #[error("Object reference {reference} holds {actual}, not a clip")]
    NotAClip {
        /// The reference that was looked up
        reference: String,
        /// Description of what the reference actually holds
        actual: &'static str,
    },

    /// The path could not be opened by the media engine
    #[error("Cannot open '{}': {reason}", path.display())]
    Unopenable {
        /// The path that was opened
        path: PathBuf,
        /// Why opening failed
        reason: String,
    },
}

impl ResolutionError {
    /// Create a new unopenable-path error.
    pub fn unopenable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ResolutionError::Unopenable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_names() {
        assert_eq!(Error::validation("x").kind(), "ValidationError");
        assert_eq!(Error::engine("x").kind(), "EngineError");
        assert_eq!(
            Error::from(ResolutionError::UnknownReference("obj://x".into())).kind(),
            "ResolutionError"
        );
        assert_eq!(
            Error::from(std::io::Error::new(std::io::ErrorKind::Other, "x")).kind(),
            "IoError"
        );
        assert_eq!(
            Error::from(ConfigError::invalid_value("PORT", "x")).kind(),
            "ConfigError"
        );
    }

    #[test]
    fn test_is_validation() {
        assert!(Error::validation("bad").is_validation());
        assert!(!Error::engine("bad").is_validation());
    }

    #[test]
    fn test_unopenable_includes_path_and_reason() {
        let err = ResolutionError::unopenable("/videos/missing.mp4", "No such file or directory");
        let msg = err.to_string();
        assert!(msg.contains("/videos/missing.mp4"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn test_not_a_clip_display() {
        let err = ResolutionError::NotAClip {
            reference: "obj://abc".to_string(),
            actual: "frames",
        };
        assert!(err.to_string().contains("obj://abc"));
        assert!(err.to_string().contains("frames"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_engine_error() {
        let err = Error::engine("Invalid data found when processing input");
        let msg = err.to_string();
        assert!(msg.contains("Engine"));
        assert!(msg.contains("Invalid data"));
    }
}
