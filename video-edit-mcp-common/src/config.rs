//! Configuration module for loading environment variables and settings.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Default output directory for rendered files.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory that output names are resolved under
    pub output_dir: PathBuf,
    /// Scratch directory for engine artifacts (rendered text, list files)
    pub work_dir: PathBuf,
    /// `ffmpeg` binary
    pub ffmpeg_path: PathBuf,
    /// `ffprobe` binary
    pub ffprobe_path: PathBuf,
    /// Upper bound on stored objects; `None` keeps every object until released
    pub max_stored_objects: Option<usize>,
    /// HTTP server port
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            work_dir: std::env::temp_dir().join("video-edit-mcp"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            max_stored_objects: None,
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and .env file.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if `MAX_STORED_OBJECTS` or `PORT`
    /// is set but not a valid number.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let output_dir = lookup("OUTPUT_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let work_dir = lookup("WORK_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.work_dir);

        let ffmpeg_path = lookup("FFMPEG_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.ffmpeg_path);

        let ffprobe_path = lookup("FFPROBE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.ffprobe_path);

        let max_stored_objects = match lookup("MAX_STORED_OBJECTS") {
            Some(raw) => {
                let value: usize = raw.trim().parse().map_err(|_| {
                    ConfigError::invalid_value("MAX_STORED_OBJECTS", format!("'{}' is not a number", raw))
                })?;
                if value == 0 {
                    return Err(ConfigError::invalid_value(
                        "MAX_STORED_OBJECTS",
                        "must be greater than zero",
                    ));
                }
                Some(value)
            }
            None => None,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::invalid_value("PORT", format!("'{}' is not a valid port", raw))
            })?,
            None => defaults.port,
        };

        Ok(Self {
            output_dir,
            work_dir,
            ffmpeg_path,
            ffprobe_path,
            max_stored_objects,
            port,
        })
    }

    /// Override the output directory.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Override the scratch directory.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }
}
