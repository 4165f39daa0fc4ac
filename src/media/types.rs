use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageBuffer, Rgb, RgbImage};

use crate::error::{PipelineError, Result};

/// Represents a single video frame
///
/// A thin wrapper around an RGB image buffer with the pixel operations the
/// assembly pipeline needs.
#[derive(Clone, Debug)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        let buffer = ImageBuffer::new(width, height);
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    /// Get the width of the frame
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Get the height of the frame
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let pixel = self.buffer.get_pixel(x, y);
        [pixel[0], pixel[1], pixel[2]]
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Get a mutable reference to the underlying image buffer
    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.buffer
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        self.buffer
            .save(path.as_ref())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        Ok(())
    }
}

/// Audio extracted for one clip, already encoded for concatenation
///
/// Holds the path to the segment file and, when that file lives in a scoped
/// temp directory, the guard keeping the directory alive for as long as any
/// clone of the segment exists.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    path: PathBuf,
    _temp_dir: Option<Arc<tempfile::TempDir>>,
}

impl AudioSegment {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            _temp_dir: None,
        }
    }

    /// Segment whose file lives inside `temp_dir`
    pub fn in_temp_dir<P: Into<PathBuf>>(path: P, temp_dir: Arc<tempfile::TempDir>) -> Self {
        Self {
            path: path.into(),
            _temp_dir: Some(temp_dir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An owned, decoded video segment
///
/// Produced by trimming a source file and carried stage to stage through the
/// pipeline; every transformation consumes its input and yields a new `Clip`.
/// All frames in a clip share the same dimensions. A clip may carry the
/// audio extracted for its time range; clips without one (generated clips,
/// silent sources) play as silence.
#[derive(Debug, Clone)]
pub struct Clip {
    frames: Vec<Frame>,
    fps: f64,
    width: u32,
    height: u32,
    audio: Option<AudioSegment>,
}

impl Clip {
    /// Build a clip from decoded frames; `None` if the frame list is empty
    pub fn from_frames(frames: Vec<Frame>, fps: f64) -> Option<Self> {
        let first = frames.first()?;
        let (width, height) = (first.width(), first.height());
        Some(Self {
            frames,
            fps,
            width,
            height,
            audio: None,
        })
    }

    /// Create an opaque black clip of the given size and duration
    ///
    /// Frame count is the duration quantized to whole frames at `fps`.
    pub fn black(width: u32, height: u32, duration: f64, fps: f64) -> Self {
        let frame_count = (duration * fps).round().max(1.0) as usize;
        let frames = vec![Frame::new_black(width, height); frame_count];
        Self {
            frames,
            fps,
            width,
            height,
            audio: None,
        }
    }

    /// Attach (or clear) the audio extracted for this clip's time range
    pub fn with_audio(mut self, audio: Option<AudioSegment>) -> Self {
        self.audio = audio;
        self
    }

    pub fn audio(&self) -> Option<&AudioSegment> {
        self.audio.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Duration in seconds, derived from the frame count
    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Consume the clip, yielding its frames
    ///
    /// Any attached audio is dropped; callers rebuilding the clip are
    /// responsible for carrying it over with [`Clip::with_audio`].
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

/// The target canvas every clip is normalized to
///
/// Computed once as the elementwise maximum of the trimmed clips' dimensions
/// and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Elementwise maximum over all clips' dimensions, rounded up to even
    ///
    /// The maxima need not come from the same clip. Each axis is rounded up
    /// to the next even value; 4:2:0 pixel formats reject odd dimensions, so
    /// an odd source gets at most one extra pixel of padding. An empty clip
    /// set cannot define a canvas and fails fast.
    pub fn from_clips(clips: &[Clip]) -> Result<Self> {
        if clips.is_empty() {
            return Err(PipelineError::EmptyClipSet.into());
        }

        let width = clips.iter().map(Clip::width).max().unwrap_or(0);
        let height = clips.iter().map(Clip::height).max().unwrap_or(0);
        Ok(Self {
            width: round_up_to_even(width),
            height: round_up_to_even(height),
        })
    }

    /// Uniform scale factor that fits `width`x`height` inside this canvas
    ///
    /// The minimum of the two axis ratios, so the scaled size never exceeds
    /// the canvas on either axis and aspect ratio is preserved.
    pub fn fit_scale(&self, width: u32, height: u32) -> f64 {
        let wr = self.width as f64 / width as f64;
        let hr = self.height as f64 / height as f64;
        wr.min(hr)
    }

    /// Scaled dimensions for fitting `width`x`height` inside this canvas
    ///
    /// Rounded to whole pixels and clamped so rounding can never push a
    /// dimension past the canvas edge.
    pub fn fit_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = self.fit_scale(width, height);
        let scaled_w = ((width as f64 * scale).round() as u32).min(self.width);
        let scaled_h = ((height as f64 * scale).round() as u32).min(self.height);
        (scaled_w.max(1), scaled_h.max(1))
    }

    /// Top-left offset that centers `width`x`height` on this canvas
    pub fn center_offset(&self, width: u32, height: u32) -> (u32, u32) {
        (
            (self.width.saturating_sub(width)) / 2,
            (self.height.saturating_sub(height)) / 2,
        )
    }
}

fn round_up_to_even(value: u32) -> u32 {
    value + (value & 1)
}

impl std::fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An ordered sequence of clips; order is final playback order
#[derive(Debug, Clone, Default)]
pub struct ClipSequence {
    clips: Vec<Clip>,
}

impl ClipSequence {
    pub fn new() -> Self {
        Self { clips: Vec::new() }
    }

    /// Append a clip; playback order follows insertion order
    pub fn push(&mut self, clip: Clip) {
        self.clips.push(clip);
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clip> {
        self.clips.iter()
    }

    /// Sum of all member durations in seconds
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(Clip::duration).sum()
    }

    /// Total frame count across all members
    pub fn total_frames(&self) -> usize {
        self.clips.iter().map(Clip::frame_count).sum()
    }

    /// True if any member carries extracted audio
    pub fn has_audio(&self) -> bool {
        self.clips.iter().any(|clip| clip.audio.is_some())
    }

    /// Check that every member matches the canvas exactly
    pub fn validate_uniform(&self, canvas: CanvasSize) -> Result<()> {
        for (index, clip) in self.clips.iter().enumerate() {
            if clip.width() != canvas.width || clip.height() != canvas.height {
                return Err(PipelineError::MismatchedCanvas {
                    index,
                    width: clip.width(),
                    height: clip.height(),
                    expected_width: canvas.width,
                    expected_height: canvas.height,
                }
                .into());
            }
        }
        Ok(())
    }
}

impl FromIterator<Clip> for ClipSequence {
    fn from_iter<I: IntoIterator<Item = Clip>>(iter: I) -> Self {
        Self {
            clips: iter.into_iter().collect(),
        }
    }
}

/// Probe result for a source file
#[derive(Debug, Clone, Copy)]
pub struct SourceInfo {
    pub duration: f64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

/// Report for an encoded output video
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub path: PathBuf,
    pub duration: f64,
    pub frame_count: usize,
    pub file_size: u64,
}
