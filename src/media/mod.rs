//! # Media Module
//!
//! Clip and frame types, letterbox normalization, and the engine boundary to
//! the underlying decode/encode machinery.

pub mod ffmpeg;
pub mod letterbox;
pub mod traits;
pub mod types;

pub use ffmpeg::FfmpegEngine;
pub use letterbox::letterbox;
pub use traits::MediaEngine;
pub use types::{AudioSegment, CanvasSize, Clip, ClipSequence, EncodedVideo, Frame, SourceInfo};
