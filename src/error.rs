use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the showreel library
#[derive(Error, Debug)]
pub enum ShowreelError {
    #[error("Media engine error: {0}")]
    Media(#[from] MediaError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the underlying media engine (probe, decode, encode)
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to probe source {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    #[error("Failed to decode segment from {path}: {reason}")]
    DecodeFailed { path: PathBuf, reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodeFailed { reason: String },
}

/// Errors raised by the assembly pipeline itself
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No clips supplied, cannot compute a target canvas")]
    EmptyClipSet,

    #[error(
        "Invalid time range for {path}: start {start}s is at or past the source duration {duration}s"
    )]
    InvalidTimeRange {
        path: PathBuf,
        start: f64,
        duration: f64,
    },

    #[error("Clip {index} is {width}x{height}, expected canvas size {expected_width}x{expected_height}")]
    MismatchedCanvas {
        index: usize,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Manifest file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse manifest file {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },
}

/// Convenience type alias for Results using ShowreelError
pub type Result<T> = std::result::Result<T, ShowreelError>;

impl ShowreelError {
    /// Get a user-friendly error message for CLI reporting
    pub fn user_message(&self) -> String {
        match self {
            Self::Media(MediaError::SourceNotFound { path }) => {
                format!(
                    "Could not find source clip '{}'. Check the paths in your manifest.",
                    path.display()
                )
            }
            Self::Media(MediaError::EncodeFailed { reason }) => {
                format!(
                    "Could not write the output video: {}. Check disk space and that FFmpeg is installed.",
                    reason
                )
            }
            Self::Pipeline(PipelineError::EmptyClipSet) => {
                "The manifest lists no clips; add at least one [[clips]] entry.".to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Manifest file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
