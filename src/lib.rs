//! # Showreel
//!
//! Assemble portfolio showreels from a manifest of source clips: trim bounded
//! segments, letterbox everything onto a shared canvas, concatenate with a
//! trailing black outro, and encode a single output video.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use showreel::{
//!     config::Config,
//!     media::FfmpegEngine,
//!     pipeline::ReelEngine,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::from_file("reel.toml")?;
//! config.validate()?;
//!
//! let engine = ReelEngine::new(config, Box::new(FfmpegEngine::new()?));
//! let report = engine.assemble().await?;
//! println!("Wrote {}", report.path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`pipeline`] - The assembly engine: trim, measure, normalize, encode
//! - [`media`] - Clip/frame types, letterboxing, and the media engine boundary
//! - [`config`] - Manifest loading and validation
//!
//! ## Swapping the media engine
//!
//! The pipeline talks to codecs only through the [`media::MediaEngine`]
//! trait, so the FFmpeg-backed default can be replaced or mocked:
//!
//! ```rust,no_run
//! use std::path::Path;
//! use async_trait::async_trait;
//! use showreel::config::RenderConfig;
//! use showreel::media::{Clip, ClipSequence, EncodedVideo, MediaEngine, SourceInfo};
//! use showreel::error::Result;
//!
//! struct MyEngine;
//!
//! #[async_trait]
//! impl MediaEngine for MyEngine {
//!     async fn probe(&self, path: &Path) -> Result<SourceInfo> {
//!         todo!()
//!     }
//!     async fn decode_clip(&self, path: &Path, start: f64, end: f64, fps: f64) -> Result<Clip> {
//!         todo!()
//!     }
//!     async fn encode(
//!         &self,
//!         sequence: &ClipSequence,
//!         settings: &RenderConfig,
//!         output: &Path,
//!     ) -> Result<EncodedVideo> {
//!         todo!()
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{Result, ShowreelError},
    media::{FfmpegEngine, MediaEngine},
    pipeline::ReelEngine,
};
