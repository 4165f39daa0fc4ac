use std::path::Path;

use async_trait::async_trait;

use crate::config::RenderConfig;
use crate::error::Result;
use crate::media::types::{Clip, ClipSequence, EncodedVideo, SourceInfo};

/// Capability interface over the underlying media machinery
///
/// Everything that actually touches codecs and containers goes through this
/// trait, so the engine can be swapped (or mocked in tests) without touching
/// the assembly pipeline. Resizing and compositing are pure frame
/// transformations and live in [`crate::media::letterbox`] instead.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Probe a source file for duration, frame rate, and resolution
    ///
    /// Returns `MediaError::SourceNotFound` if the file does not exist.
    async fn probe(&self, path: &Path) -> Result<SourceInfo>;

    /// Decode the `[start, end)` segment of a source into an owned clip
    ///
    /// Frames are sampled at `fps` so every decoded clip shares the output
    /// frame rate. Callers are expected to have clamped `end` to the source
    /// duration; requesting past end-of-stream is engine-defined behavior.
    async fn decode_clip(&self, path: &Path, start: f64, end: f64, fps: f64) -> Result<Clip>;

    /// Encode a clip sequence to a single output file
    ///
    /// Clips are written strictly in sequence order with hard cuts. Any
    /// existing file at `output` is overwritten.
    async fn encode(
        &self,
        sequence: &ClipSequence,
        settings: &RenderConfig,
        output: &Path,
    ) -> Result<EncodedVideo>;
}
