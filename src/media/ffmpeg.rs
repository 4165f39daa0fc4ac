//! Default [`MediaEngine`] backed by external `ffmpeg` / `ffprobe` commands
//!
//! Container demuxing, codec decode/encode, and muxing stay inside FFmpeg;
//! this module only moves frames across the process boundary as PNG files in
//! scoped temp directories. Audio is cut per clip at decode time, stitched
//! into one track (silence filling the gaps), and muxed into the output
//! after the video encode.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use rayon::prelude::*;
use serde::Deserialize;
use tokio::task;
use tracing::{debug, info};

use crate::config::RenderConfig;
use crate::error::{MediaError, Result};
use crate::media::traits::MediaEngine;
use crate::media::types::{AudioSegment, Clip, ClipSequence, EncodedVideo, Frame, SourceInfo};

/// Media engine that shells out to the system FFmpeg installation
pub struct FfmpegEngine;

impl FfmpegEngine {
    /// Create the engine, verifying that `ffmpeg` and `ffprobe` are on the PATH
    ///
    /// Both are checked up front; probing would otherwise fail mid-run on an
    /// installation that ships `ffmpeg` without `ffprobe`.
    pub fn new() -> Result<Self> {
        for tool in ["ffmpeg", "ffprobe"] {
            if !Self::tool_available(tool) {
                return Err(MediaError::EncodeFailed {
                    reason: format!("{} not found on PATH. Please install FFmpeg.", tool),
                }
                .into());
            }
        }
        info!("Initialized FFmpeg media engine");
        Ok(Self)
    }

    /// Check whether the full FFmpeg suite is available
    pub fn ffmpeg_available() -> bool {
        Self::tool_available("ffmpeg") && Self::tool_available("ffprobe")
    }

    fn tool_available(tool: &str) -> bool {
        Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn quality_to_crf(quality: u8) -> u8 {
        (51 - ((quality as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
    }

    /// Write every frame of the sequence as a numbered PNG
    fn save_sequence_frames(sequence: &ClipSequence, temp_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut frame_paths = Vec::with_capacity(sequence.total_frames());
        let mut frame_counter = 0usize;

        for clip in sequence.iter() {
            for frame in clip.frames() {
                let frame_path = temp_dir.join(format!("frame_{:06}.png", frame_counter));
                frame.save_png(&frame_path)?;
                frame_paths.push(frame_path);
                frame_counter += 1;
            }
        }

        debug!("Saved {} frames for encoding", frame_counter);
        Ok(frame_paths)
    }

    /// Write the concat-demuxer list pairing each frame with its display duration
    fn create_frame_list(frame_paths: &[PathBuf], fps: f64, temp_dir: &Path) -> Result<PathBuf> {
        let list_path = temp_dir.join("frame_list.txt");
        let mut file = File::create(&list_path)?;

        let frame_duration = 1.0 / fps;
        for frame_path in frame_paths {
            writeln!(file, "file '{}'", frame_path.display())?;
            writeln!(file, "duration {:.6}", frame_duration)?;
        }

        // The concat demuxer ignores the duration of the final entry unless
        // the last file is repeated.
        if let Some(last_frame) = frame_paths.last() {
            writeln!(file, "file '{}'", last_frame.display())?;
        }

        Ok(list_path)
    }

    /// Cut the segment's audio into a standalone AAC file
    ///
    /// Returns `None` for sources without an audio stream; the encode step
    /// fills those slots with silence so later segments stay aligned with
    /// the video. Segments are normalized to stereo 44.1 kHz AAC so the
    /// concat demuxer can join them without re-encoding.
    async fn extract_audio(path: &Path, start: f64, duration: f64) -> Result<Option<AudioSegment>> {
        let temp_dir = Arc::new(tempfile::tempdir()?);
        let audio_path = temp_dir.path().join("audio.m4a");

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-ss", &start.to_string(), "-t", &duration.to_string()])
            .arg("-i")
            .arg(path)
            .args(["-vn", "-ac", "2", "-ar", "44100", "-c:a", "aac", "-y"])
            .arg(&audio_path);

        let output = task::spawn_blocking(move || cmd.output())
            .await
            .map_err(|e| MediaError::DecodeFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to spawn FFmpeg: {}", e),
            })?
            .map_err(|e| MediaError::DecodeFailed {
                path: path.to_path_buf(),
                reason: format!("FFmpeg execution failed: {}", e),
            })?;

        // FFmpeg exits non-zero here when the source has no audio stream.
        if !output.status.success() || !audio_path.exists() {
            debug!("No audio stream in {}, segment plays silent", path.display());
            return Ok(None);
        }

        Ok(Some(AudioSegment::in_temp_dir(audio_path, temp_dir)))
    }

    /// Encode the frame list into a video-only file
    async fn encode_video(frame_list: &Path, settings: &RenderConfig, output: &Path) -> Result<()> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-f", "concat", "-safe", "0", "-i"])
            .arg(frame_list)
            // Video codec is left to FFmpeg's default for the output
            // container.
            .args([
                "-r",
                &settings.fps.to_string(),
                "-pix_fmt",
                "yuv420p",
                "-crf",
                &Self::quality_to_crf(settings.quality).to_string(),
                "-y",
            ])
            .arg(output);

        Self::run_ffmpeg(cmd, "Output encode failed").await
    }

    /// Stitch per-clip audio into one track matching the sequence timeline
    ///
    /// Clips without audio (the outro included) contribute silence of their
    /// exact duration so every later segment keeps its alignment.
    async fn build_audio_track(sequence: &ClipSequence, temp_dir: &Path) -> Result<PathBuf> {
        let mut segment_paths = Vec::with_capacity(sequence.len());
        for (index, clip) in sequence.iter().enumerate() {
            match clip.audio() {
                Some(segment) => segment_paths.push(segment.path().to_path_buf()),
                None => {
                    let silence = temp_dir.join(format!("silence_{:03}.m4a", index));
                    Self::generate_silence(clip.duration(), &silence).await?;
                    segment_paths.push(silence);
                }
            }
        }

        let list_path = temp_dir.join("audio_list.txt");
        let mut file = File::create(&list_path)?;
        for path in &segment_paths {
            writeln!(file, "file '{}'", path.display())?;
        }

        let track_path = temp_dir.join("audio_track.m4a");
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .args(["-c", "copy", "-y"])
            .arg(&track_path);

        Self::run_ffmpeg(cmd, "Audio concat failed").await?;
        Ok(track_path)
    }

    /// Generate an AAC silence segment of the given duration
    async fn generate_silence(duration: f64, output: &Path) -> Result<()> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args([
            "-f",
            "lavfi",
            "-t",
            &format!("{:.6}", duration),
            "-i",
            "anullsrc=channel_layout=stereo:sample_rate=44100",
            "-c:a",
            "aac",
            "-y",
        ])
        .arg(output);

        Self::run_ffmpeg(cmd, "Silence generation failed").await
    }

    /// Mux the audio track into the encoded video without touching frames
    async fn mux_audio(
        video: &Path,
        audio: &Path,
        settings: &RenderConfig,
        output: &Path,
    ) -> Result<()> {
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-c:v", "copy", "-c:a", &settings.audio_codec, "-shortest", "-y"])
            .arg(output);

        Self::run_ffmpeg(cmd, "Audio mux failed").await
    }

    async fn run_ffmpeg(mut cmd: Command, context: &str) -> Result<()> {
        let output = task::spawn_blocking(move || cmd.output())
            .await
            .map_err(|e| MediaError::EncodeFailed {
                reason: format!("Failed to spawn FFmpeg process: {}", e),
            })?
            .map_err(|e| MediaError::EncodeFailed {
                reason: format!("FFmpeg execution failed: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::EncodeFailed {
                reason: format!("{}: {}", context, stderr),
            }
            .into());
        }

        Ok(())
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe(&self, path: &Path) -> Result<SourceInfo> {
        if !path.exists() {
            return Err(MediaError::SourceNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let path_buf = path.to_path_buf();
        let output = task::spawn_blocking(move || {
            Command::new("ffprobe")
                .args([
                    "-v",
                    "quiet",
                    "-print_format",
                    "json",
                    "-show_streams",
                    "-show_format",
                    "-select_streams",
                    "v:0",
                ])
                .arg(&path_buf)
                .output()
        })
        .await
        .map_err(|e| MediaError::ProbeFailed {
            path: path.to_path_buf(),
            reason: format!("Failed to spawn ffprobe: {}", e),
        })?
        .map_err(|e| MediaError::ProbeFailed {
            path: path.to_path_buf(),
            reason: format!("ffprobe execution failed: {}", e),
        })?;

        if !output.status.success() {
            return Err(MediaError::ProbeFailed {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            }
            .into());
        }

        let report: FfprobeReport =
            serde_json::from_slice(&output.stdout).map_err(|e| MediaError::ProbeFailed {
                path: path.to_path_buf(),
                reason: format!("Invalid ffprobe output: {}", e),
            })?;

        let info = report.into_source_info().ok_or_else(|| MediaError::ProbeFailed {
            path: path.to_path_buf(),
            reason: "No decodable video stream found".to_string(),
        })?;

        info!(
            "Probed {}: {}x{} @ {:.1}fps, {:.2}s",
            path.display(),
            info.width,
            info.height,
            info.fps,
            info.duration
        );
        Ok(info)
    }

    async fn decode_clip(&self, path: &Path, start: f64, end: f64, fps: f64) -> Result<Clip> {
        let temp_dir = tempfile::tempdir()?;
        let pattern = temp_dir.path().join("frame_%06d.png");
        let duration = end - start;

        debug!(
            "Decoding [{:.3}s, {:.3}s) of {} at {:.1}fps",
            start,
            end,
            path.display(),
            fps
        );

        let mut cmd = Command::new("ffmpeg");
        // Seek before the input for fast keyframe seeking.
        cmd.args(["-ss", &start.to_string(), "-t", &duration.to_string()])
            .arg("-i")
            .arg(path)
            .args(["-vf", &format!("fps={}", fps), "-f", "image2", "-y"])
            .arg(&pattern);

        let output = task::spawn_blocking(move || cmd.output())
            .await
            .map_err(|e| MediaError::DecodeFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to spawn FFmpeg: {}", e),
            })?
            .map_err(|e| MediaError::DecodeFailed {
                path: path.to_path_buf(),
                reason: format!("FFmpeg execution failed: {}", e),
            })?;

        if !output.status.success() {
            return Err(MediaError::DecodeFailed {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            }
            .into());
        }

        let mut frame_paths: Vec<PathBuf> = std::fs::read_dir(temp_dir.path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
            .collect();
        frame_paths.sort();

        let frames: Vec<Frame> = frame_paths
            .par_iter()
            .map(|frame_path| {
                image::open(frame_path)
                    .map(|img| Frame::new(img.to_rgb8()))
                    .map_err(|e| {
                        MediaError::DecodeFailed {
                            path: path.to_path_buf(),
                            reason: format!("Frame load failed: {}", e),
                        }
                        .into()
                    })
            })
            .collect::<Result<Vec<Frame>>>()?;

        debug!("Decoded {} frames from {}", frames.len(), path.display());

        let clip = Clip::from_frames(frames, fps).ok_or(MediaError::DecodeFailed {
            path: path.to_path_buf(),
            reason: "Requested range produced no frames".to_string(),
        })?;

        let audio = Self::extract_audio(path, start, duration).await?;
        Ok(clip.with_audio(audio))
    }

    async fn encode(
        &self,
        sequence: &ClipSequence,
        settings: &RenderConfig,
        output: &Path,
    ) -> Result<EncodedVideo> {
        info!(
            "Encoding {} clips ({} frames) to {}",
            sequence.len(),
            sequence.total_frames(),
            output.display()
        );

        let temp_dir = tempfile::tempdir()?;
        let frame_paths = Self::save_sequence_frames(sequence, temp_dir.path())?;
        let frame_list = Self::create_frame_list(&frame_paths, settings.fps, temp_dir.path())?;

        if sequence.has_audio() {
            // Two passes: frames to a video-only file, then the stitched
            // audio track muxed in with the frames copied untouched.
            let video_only = temp_dir.path().join("video_only.mp4");
            Self::encode_video(&frame_list, settings, &video_only).await?;

            let audio_track = Self::build_audio_track(sequence, temp_dir.path()).await?;
            Self::mux_audio(&video_only, &audio_track, settings, output).await?;
        } else {
            Self::encode_video(&frame_list, settings, output).await?;
        }

        let metadata = std::fs::metadata(output)?;
        let encoded = EncodedVideo {
            path: output.to_path_buf(),
            duration: sequence.total_duration(),
            frame_count: sequence.total_frames(),
            file_size: metadata.len(),
        };

        info!(
            "Encode complete: {:.1}s, {} frames, {:.1} MB",
            encoded.duration,
            encoded.frame_count,
            encoded.file_size as f64 / 1024.0 / 1024.0
        );
        Ok(encoded)
    }
}

/// Subset of `ffprobe -print_format json` output this engine reads
#[derive(Debug, Deserialize)]
struct FfprobeReport {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

impl FfprobeReport {
    fn into_source_info(self) -> Option<SourceInfo> {
        let stream = self
            .streams
            .iter()
            .find(|s| s.width.is_some() && s.height.is_some())?;

        // Stream-level duration is preferred; WebM and friends only carry it
        // at the container level.
        let duration = stream
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .or_else(|| {
                self.format
                    .as_ref()
                    .and_then(|f| f.duration.as_deref())
                    .and_then(|d| d.parse::<f64>().ok())
            })?;

        let fps = stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .unwrap_or(30.0);

        Some(SourceInfo {
            duration,
            fps,
            width: stream.width?,
            height: stream.height?,
        })
    }
}

/// Parse ffprobe's rational frame rate ("30000/1001") into frames per second
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}
