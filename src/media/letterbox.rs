//! Letterbox normalization
//!
//! Fits each clip inside the target canvas with a uniform scale factor and
//! composites it centered over an opaque black background, so every clip in
//! the final sequence shares exact canvas dimensions.

use image::imageops::{self, FilterType};
use rayon::prelude::*;
use tracing::debug;

use crate::media::types::{CanvasSize, Clip, Frame};

/// Normalize a clip to the canvas by uniform scale + centered composite
///
/// The output clip has exactly canvas dimensions, the same frame count, and
/// therefore the same duration as the input. Frames are processed in
/// parallel.
pub fn letterbox(clip: Clip, canvas: CanvasSize) -> Clip {
    // Already canvas-sized: scale is 1.0 with zero padding on both axes.
    if clip.width() == canvas.width && clip.height() == canvas.height {
        debug!(
            "Clip already matches canvas {}, skipping letterbox",
            canvas
        );
        return clip;
    }

    let (scaled_w, scaled_h) = canvas.fit_dimensions(clip.width(), clip.height());
    let (offset_x, offset_y) = canvas.center_offset(scaled_w, scaled_h);

    debug!(
        "Letterboxing {}x{} -> {} (scaled {}x{}, offset {},{})",
        clip.width(),
        clip.height(),
        canvas,
        scaled_w,
        scaled_h,
        offset_x,
        offset_y
    );

    let fps = clip.fps();
    let audio = clip.audio().cloned();
    let frames: Vec<Frame> = clip
        .into_frames()
        .into_par_iter()
        .map(|frame| letterbox_frame(&frame, canvas, scaled_w, scaled_h, offset_x, offset_y))
        .collect();

    // Frame list is non-empty because the input clip was.
    Clip::from_frames(frames, fps)
        .expect("letterboxed clip preserves frame count")
        .with_audio(audio)
}

/// Scale one frame and composite it centered over a black canvas frame
fn letterbox_frame(
    frame: &Frame,
    canvas: CanvasSize,
    scaled_w: u32,
    scaled_h: u32,
    offset_x: u32,
    offset_y: u32,
) -> Frame {
    let resized = imageops::resize(frame.as_image(), scaled_w, scaled_h, FilterType::Lanczos3);

    let mut background = Frame::new_black(canvas.width, canvas.height);
    imageops::overlay(
        background.as_image_mut(),
        &resized,
        offset_x as i64,
        offset_y as i64,
    );
    background
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_clip(width: u32, height: u32, frame_count: usize, color: [u8; 3]) -> Clip {
        let frames = vec![Frame::new_filled(width, height, color); frame_count];
        Clip::from_frames(frames, 30.0).unwrap()
    }

    #[test]
    fn test_output_matches_canvas_exactly() {
        let canvas = CanvasSize::new(1280, 720);
        for &(w, h) in &[(640u32, 360u32), (640, 480), (1280, 720), (1920, 1080)] {
            let clip = filled_clip(w, h, 3, [120, 80, 40]);
            let boxed = letterbox(clip, canvas);
            assert_eq!(boxed.width(), canvas.width);
            assert_eq!(boxed.height(), canvas.height);
        }
    }

    #[test]
    fn test_duration_and_frame_count_preserved() {
        let canvas = CanvasSize::new(1280, 720);
        let clip = filled_clip(640, 480, 45, [10, 200, 10]);
        let duration = clip.duration();

        let boxed = letterbox(clip, canvas);
        assert_eq!(boxed.frame_count(), 45);
        assert!((boxed.duration() - duration).abs() < 1e-9);
    }

    #[test]
    fn test_exact_fit_has_zero_padding() {
        // 640x360 scales by 2.0 into 1280x720 with no bars anywhere
        let canvas = CanvasSize::new(1280, 720);
        let clip = filled_clip(640, 360, 1, [255, 255, 255]);
        let boxed = letterbox(clip, canvas);

        for &(x, y) in &[(0u32, 0u32), (1279, 0), (0, 719), (640, 360)] {
            assert_eq!(boxed.frames()[0].get_pixel(x, y), [255, 255, 255]);
        }
    }

    #[test]
    fn test_height_bound_clip_gets_side_bars() {
        // 640x480 into 1280x720: scale 1.5 -> 960x720 centered, 160px bars
        let canvas = CanvasSize::new(1280, 720);
        let clip = filled_clip(640, 480, 1, [255, 255, 255]);
        let boxed = letterbox(clip, canvas);
        let frame = &boxed.frames()[0];

        // Black bars left and right of the scaled content
        assert_eq!(frame.get_pixel(0, 360), [0, 0, 0]);
        assert_eq!(frame.get_pixel(159, 360), [0, 0, 0]);
        assert_eq!(frame.get_pixel(1120, 360), [0, 0, 0]);
        assert_eq!(frame.get_pixel(1279, 360), [0, 0, 0]);

        // Content fills the centered 960x720 region edge to edge
        assert_eq!(frame.get_pixel(160, 0), [255, 255, 255]);
        assert_eq!(frame.get_pixel(640, 360), [255, 255, 255]);
        assert_eq!(frame.get_pixel(1119, 719), [255, 255, 255]);
    }

    #[test]
    fn test_audio_survives_letterboxing() {
        use crate::media::types::AudioSegment;
        use std::path::Path;

        let canvas = CanvasSize::new(1280, 720);
        let clip = filled_clip(640, 480, 3, [90, 90, 90])
            .with_audio(Some(AudioSegment::new("trimmed.m4a")));

        let boxed = letterbox(clip, canvas);
        assert_eq!(boxed.audio().unwrap().path(), Path::new("trimmed.m4a"));
    }

    #[test]
    fn test_aspect_ratio_preserved() {
        let canvas = CanvasSize::new(1280, 720);
        for &(w, h) in &[(640u32, 480u32), (1920, 804), (350, 700)] {
            let (sw, sh) = canvas.fit_dimensions(w, h);
            let original = w as f64 / h as f64;
            let scaled = sw as f64 / sh as f64;
            // Within a pixel of rounding slack on either axis
            assert!(
                (original - scaled).abs() < 0.01,
                "aspect drifted for {}x{}: {} vs {}",
                w,
                h,
                original,
                scaled
            );
        }
    }

    #[test]
    fn test_downscale_never_exceeds_canvas() {
        let canvas = CanvasSize::new(854, 480);
        let clip = filled_clip(1920, 1080, 2, [30, 30, 200]);
        let boxed = letterbox(clip, canvas);
        assert_eq!(boxed.width(), 854);
        assert_eq!(boxed.height(), 480);
    }
}
