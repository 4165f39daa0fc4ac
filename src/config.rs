use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for a showreel assembly run
///
/// Loaded from a TOML manifest listing the source clips to trim plus the
/// render settings for the final output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source clips in playback order
    #[serde(default)]
    pub clips: Vec<ClipSpec>,

    /// Output file settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Render settings
    #[serde(default)]
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clips: Vec::new(),
            output: OutputConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML manifest
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML manifest
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (i, clip) in self.clips.iter().enumerate() {
            clip.validate(i)?;
        }
        self.render.validate()?;
        Ok(())
    }
}

/// One source clip's contribution to the reel: a bounded time range of a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipSpec {
    /// Path to the source video file
    pub path: PathBuf,

    /// Trim start within the source (seconds)
    pub start: f64,

    /// Requested trim end within the source (seconds); clamped to the
    /// source's real duration at assembly time
    pub end: f64,
}

impl ClipSpec {
    /// Create a new clip spec
    pub fn new<P: Into<PathBuf>>(path: P, start: f64, end: f64) -> Self {
        Self {
            path: path.into(),
            start,
            end,
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.start < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: format!("clips[{}].start", index),
                value: self.start.to_string(),
            }
            .into());
        }

        if self.end <= self.start {
            return Err(ConfigError::InvalidValue {
                key: format!("clips[{}].range", index),
                value: format!("{}-{}", self.start, self.end),
            }
            .into());
        }

        Ok(())
    }
}

/// Output file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path for the final encoded video; overwritten if it already exists
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("portfolio_showreel.mp4"),
        }
    }
}

/// Render settings for the final encode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output frame rate
    pub fps: f64,

    /// Audio codec for the output container
    pub audio_codec: String,

    /// Duration of the trailing black outro (seconds)
    pub outro_duration: f64,

    /// Quality setting (0-100, higher is better); mapped to encoder CRF
    pub quality: u8,

    /// Number of parallel frame-processing threads
    pub processing_threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            audio_codec: "aac".to_string(),
            outro_duration: 2.0,
            quality: 85,
            processing_threads: num_cpus::get(),
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<()> {
        if self.fps <= 0.0 || !self.fps.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "render.fps".to_string(),
                value: self.fps.to_string(),
            }
            .into());
        }

        if self.outro_duration < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "render.outro_duration".to_string(),
                value: self.outro_duration.to_string(),
            }
            .into());
        }

        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "render.quality".to_string(),
                value: self.quality.to_string(),
            }
            .into());
        }

        if self.audio_codec.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "render.audio_codec".to_string(),
                value: "<empty>".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
