use tracing::{debug, info};

use crate::{
    config::{ClipSpec, Config},
    error::{PipelineError, Result},
    media::{letterbox, CanvasSize, Clip, ClipSequence, EncodedVideo, MediaEngine},
};

/// Assembly engine that turns a clip manifest into a finished showreel
///
/// The engine runs a straight-line pipeline with no retries or branching:
/// 1. Trim - probe each source and decode the bounded segment, clamping the
///    end time to the source's real duration
/// 2. Measure - derive the target canvas from the trimmed clips
/// 3. Normalize - letterbox every clip onto the canvas
/// 4. Assemble - append the black outro, concatenate in manifest order, and
///    encode the result
pub struct ReelEngine {
    config: Config,
    engine: Box<dyn MediaEngine>,
}

impl ReelEngine {
    /// Create a new engine with the given configuration and media engine
    pub fn new(config: Config, engine: Box<dyn MediaEngine>) -> Self {
        Self { config, engine }
    }

    /// Run the full pipeline and write the output file
    pub async fn assemble(&self) -> Result<EncodedVideo> {
        info!("Starting showreel assembly");
        info!("   Clips: {}", self.config.clips.len());
        info!("   Output: {}", self.config.output.path.display());

        if self.config.clips.is_empty() {
            return Err(PipelineError::EmptyClipSet.into());
        }

        self.configure_thread_pool();

        // Step 1: Trim
        let trimmed = self.trim_clips().await?;

        // Step 2: Measure
        let canvas = CanvasSize::from_clips(&trimmed)?;
        info!("Target canvas: {}", canvas);

        // Step 3: Normalize
        let sequence = self.normalize_clips(trimmed, canvas)?;

        // Step 4: Assemble
        let report = self.assemble_output(sequence, canvas).await?;

        info!(
            "Showreel complete: {} ({:.1}s)",
            report.path.display(),
            report.duration
        );
        Ok(report)
    }

    /// Trim every source clip listed in the manifest, in order
    async fn trim_clips(&self) -> Result<Vec<Clip>> {
        info!("Step 1: Trimming {} source clips...", self.config.clips.len());

        let fps = self.config.render.fps;
        let mut trimmed = Vec::with_capacity(self.config.clips.len());

        for spec in &self.config.clips {
            let clip = self.trim_clip(spec, fps).await?;
            debug!(
                "Trimmed {}: {}x{}, {:.2}s",
                spec.path.display(),
                clip.width(),
                clip.height(),
                clip.duration()
            );
            trimmed.push(clip);
        }

        Ok(trimmed)
    }

    /// Trim one clip: probe, validate the range, clamp, decode
    async fn trim_clip(&self, spec: &ClipSpec, fps: f64) -> Result<Clip> {
        let source = self.engine.probe(&spec.path).await?;

        // A start at or past end-of-stream can only yield an empty or
        // negative-length subclip; fail fast instead.
        if spec.start >= source.duration {
            return Err(PipelineError::InvalidTimeRange {
                path: spec.path.clone(),
                start: spec.start,
                duration: source.duration,
            }
            .into());
        }

        let clamped_end = spec.end.min(source.duration);
        if clamped_end < spec.end {
            debug!(
                "Clamped end of {} from {:.2}s to source duration {:.2}s",
                spec.path.display(),
                spec.end,
                clamped_end
            );
        }

        self.engine
            .decode_clip(&spec.path, spec.start, clamped_end, fps)
            .await
    }

    /// Letterbox every trimmed clip onto the shared canvas
    fn normalize_clips(&self, trimmed: Vec<Clip>, canvas: CanvasSize) -> Result<ClipSequence> {
        info!("Step 3: Letterboxing clips to {}...", canvas);

        let sequence: ClipSequence = trimmed
            .into_iter()
            .map(|clip| letterbox(clip, canvas))
            .collect();

        sequence.validate_uniform(canvas)?;
        Ok(sequence)
    }

    /// Append the outro, concatenate, and encode the final output
    async fn assemble_output(
        &self,
        mut sequence: ClipSequence,
        canvas: CanvasSize,
    ) -> Result<EncodedVideo> {
        let render = &self.config.render;

        if render.outro_duration > 0.0 {
            let outro = Clip::black(canvas.width, canvas.height, render.outro_duration, render.fps);
            debug!(
                "Appending {:.1}s black outro ({} frames)",
                render.outro_duration,
                outro.frame_count()
            );
            sequence.push(outro);
        }

        info!(
            "Step 4: Encoding {} clips, {:.1}s total, at {:.0} fps...",
            sequence.len(),
            sequence.total_duration(),
            render.fps
        );

        self.engine
            .encode(&sequence, render, &self.config.output.path)
            .await
    }

    fn configure_thread_pool(&self) {
        let threads = self.config.render.processing_threads;
        if rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .is_ok()
        {
            debug!("Frame processing pool sized to {} threads", threads);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::config::{ClipSpec, OutputConfig, RenderConfig};
    use crate::error::{MediaError, ShowreelError};
    use crate::media::types::{AudioSegment, Frame, SourceInfo};

    /// In-memory engine producing synthetic clips; records what it encodes
    struct MockEngine {
        sources: HashMap<PathBuf, SourceInfo>,
        encoded: Mutex<Option<ClipSequence>>,
    }

    impl MockEngine {
        fn new(sources: Vec<(&str, SourceInfo)>) -> Self {
            Self {
                sources: sources
                    .into_iter()
                    .map(|(path, info)| (PathBuf::from(path), info))
                    .collect(),
                encoded: Mutex::new(None),
            }
        }

        fn take_encoded(&self) -> ClipSequence {
            self.encoded.lock().unwrap().take().expect("nothing encoded")
        }
    }

    fn source(duration: f64, width: u32, height: u32) -> SourceInfo {
        SourceInfo {
            duration,
            fps: 30.0,
            width,
            height,
        }
    }

    #[async_trait]
    impl MediaEngine for MockEngine {
        async fn probe(&self, path: &Path) -> Result<SourceInfo> {
            self.sources.get(path).copied().ok_or_else(|| {
                MediaError::SourceNotFound {
                    path: path.to_path_buf(),
                }
                .into()
            })
        }

        async fn decode_clip(&self, path: &Path, start: f64, end: f64, fps: f64) -> Result<Clip> {
            let info = self.probe(path).await?;
            let frame_count = ((end - start) * fps).round().max(1.0) as usize;
            let frames = vec![Frame::new_filled(info.width, info.height, [200, 200, 200]); frame_count];

            // Every mock source carries audio, cut alongside the frames
            let audio = AudioSegment::new(path.with_extension("m4a"));
            Ok(Clip::from_frames(frames, fps).unwrap().with_audio(Some(audio)))
        }

        async fn encode(
            &self,
            sequence: &ClipSequence,
            _settings: &RenderConfig,
            output: &Path,
        ) -> Result<EncodedVideo> {
            *self.encoded.lock().unwrap() = Some(sequence.clone());
            Ok(EncodedVideo {
                path: output.to_path_buf(),
                duration: sequence.total_duration(),
                frame_count: sequence.total_frames(),
                file_size: 0,
            })
        }
    }

    #[async_trait]
    impl MediaEngine for std::sync::Arc<MockEngine> {
        async fn probe(&self, path: &Path) -> Result<SourceInfo> {
            (**self).probe(path).await
        }

        async fn decode_clip(&self, path: &Path, start: f64, end: f64, fps: f64) -> Result<Clip> {
            (**self).decode_clip(path, start, end, fps).await
        }

        async fn encode(
            &self,
            sequence: &ClipSequence,
            settings: &RenderConfig,
            output: &Path,
        ) -> Result<EncodedVideo> {
            (**self).encode(sequence, settings, output).await
        }
    }

    fn config_with(clips: Vec<ClipSpec>) -> Config {
        Config {
            clips,
            output: OutputConfig::default(),
            render: RenderConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_trim_clamps_end_to_source_duration() {
        // 10s source, trim [8, 11] -> 2s clip, not 3s
        let engine = MockEngine::new(vec![("a.webm", source(10.0, 1280, 720))]);
        let config = config_with(vec![ClipSpec::new("a.webm", 8.0, 11.0)]);

        let reel = ReelEngine::new(config, Box::new(engine));
        let report = reel.assemble().await.unwrap();

        // 2s clip + 2s outro
        assert!((report.duration - 4.0).abs() < 1e-6);
        assert_eq!(report.frame_count, 120);
    }

    #[tokio::test]
    async fn test_start_past_duration_is_rejected() {
        let engine = MockEngine::new(vec![("a.webm", source(5.0, 1280, 720))]);
        let config = config_with(vec![ClipSpec::new("a.webm", 5.0, 7.0)]);

        let reel = ReelEngine::new(config, Box::new(engine));
        let result = reel.assemble().await;
        assert!(matches!(
            result,
            Err(ShowreelError::Pipeline(
                PipelineError::InvalidTimeRange { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_missing_source_aborts_run() {
        let engine = MockEngine::new(vec![("a.webm", source(5.0, 1280, 720))]);
        let config = config_with(vec![
            ClipSpec::new("a.webm", 0.0, 2.0),
            ClipSpec::new("missing.webm", 0.0, 2.0),
        ]);

        let reel = ReelEngine::new(config, Box::new(engine));
        let result = reel.assemble().await;
        assert!(matches!(
            result,
            Err(ShowreelError::Media(MediaError::SourceNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_empty_manifest_is_rejected() {
        let engine = MockEngine::new(vec![]);
        let config = config_with(vec![]);

        let reel = ReelEngine::new(config, Box::new(engine));
        let result = reel.assemble().await;
        assert!(matches!(
            result,
            Err(ShowreelError::Pipeline(PipelineError::EmptyClipSet))
        ));
    }

    #[tokio::test]
    async fn test_sequence_order_and_outro() {
        let engine = std::sync::Arc::new(MockEngine::new(vec![
            ("a.webm", source(10.0, 640, 360)),
            ("b.webm", source(10.0, 1280, 720)),
        ]));

        let config = config_with(vec![
            ClipSpec::new("a.webm", 1.0, 3.0), // 2s
            ClipSpec::new("b.webm", 0.0, 4.0), // 4s
            ClipSpec::new("a.webm", 4.0, 5.0), // 1s
        ]);

        let reel = ReelEngine::new(config, Box::new(engine.clone()));
        let report = reel.assemble().await.unwrap();

        let sequence = engine.take_encoded();

        // 3 inputs + 1 outro, manifest order preserved, outro last
        assert_eq!(sequence.len(), 4);
        let frame_counts: Vec<usize> =
            sequence.iter().map(Clip::frame_count).collect();
        assert_eq!(frame_counts, vec![60, 120, 30, 60]);

        // Every member letterboxed to the shared 1280x720 canvas
        for clip in sequence.iter() {
            assert_eq!(clip.width(), 1280);
            assert_eq!(clip.height(), 720);
        }

        // Outro is pure black
        let outro = sequence.clips().last().unwrap();
        assert_eq!(outro.frames()[0].get_pixel(640, 360), [0, 0, 0]);

        // Total duration = 2 + 4 + 1 + 2s outro
        assert!((report.duration - 9.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_source_audio_carried_to_encode() {
        let engine = std::sync::Arc::new(MockEngine::new(vec![
            ("a.webm", source(10.0, 1280, 720)),
            ("b.webm", source(10.0, 640, 360)),
        ]));

        let config = config_with(vec![
            ClipSpec::new("a.webm", 0.0, 2.0),
            ClipSpec::new("b.webm", 1.0, 3.0),
        ]);

        let reel = ReelEngine::new(config, Box::new(engine.clone()));
        reel.assemble().await.unwrap();

        let sequence = engine.take_encoded();
        assert!(sequence.has_audio());

        // Both trimmed clips reach the encoder with their audio attached;
        // b.webm goes through letterboxing, which must not drop it
        let audio_paths: Vec<Option<PathBuf>> = sequence
            .iter()
            .map(|clip| clip.audio().map(|a| a.path().to_path_buf()))
            .collect();
        assert_eq!(audio_paths[0].as_deref(), Some(Path::new("a.m4a")));
        assert_eq!(audio_paths[1].as_deref(), Some(Path::new("b.m4a")));

        // The generated outro carries none and plays as silence
        assert!(audio_paths[2].is_none());
    }

    #[tokio::test]
    async fn test_zero_outro_is_skipped() {
        let engine = MockEngine::new(vec![("a.webm", source(10.0, 1280, 720))]);
        let mut config = config_with(vec![ClipSpec::new("a.webm", 0.0, 2.0)]);
        config.render.outro_duration = 0.0;

        let reel = ReelEngine::new(config, Box::new(engine));
        let report = reel.assemble().await.unwrap();
        assert!((report.duration - 2.0).abs() < 1e-6);
    }
}
