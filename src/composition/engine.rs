use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    audio::OfflineDevice,
    config::Config,
    encoder::{FfmpegEncoder, FfmpegSettings, MemoryEncoder, TimelineEncoder},
    error::{EncoderError, Result},
    player::{AssetLoader, CancelSignal, ExportProgress, ExportReport, FsAssetLoader, ScenePlayer},
    scene::SceneList,
};

type SharedProgress = Arc<dyn Fn(ExportProgress) + Send + Sync>;

/// Main compositor that turns a scene list into one narrated video
///
/// The export follows a clear pipeline:
/// 1. Validation - Check the configuration and the scene list
/// 2. Setup - Build the renderer, the offline playback device and the encoder
/// 3. Playback - Play every scene in order, rendering frames off the audio clock
/// 4. Output - Mux the captured frames and audio into the output file
pub struct SceneCompositor {
    config: Config,
    loader: Arc<dyn AssetLoader>,
    progress: Option<SharedProgress>,
}

impl SceneCompositor {
    /// Create a compositor reading assets from the filesystem
    pub fn new(config: Config) -> Self {
        Self {
            config,
            loader: Arc::new(FsAssetLoader),
            progress: None,
        }
    }

    /// Resolve scene assets through a custom loader
    pub fn with_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Called after each scene and once more when the output is written
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ExportProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Render `scenes` into a video file at `output`.
    ///
    /// All-or-nothing: on failure or cancellation nothing is written to
    /// `output` and the error names the scene that caused it.
    pub async fn export<P: AsRef<Path>>(
        &self,
        scenes: &SceneList,
        output: P,
        cancel: CancelSignal,
    ) -> Result<ExportReport> {
        let output = output.as_ref();

        info!("🎬 Starting export of \"{}\"", scenes.title());
        info!("   Scenes: {}", scenes.len());
        info!("   Output: {:?}", output);

        // Pipeline Step 1: Validation
        self.config.validate()?;

        // Pipeline Step 2: Encoder setup
        let settings = FfmpegSettings::from_config(&self.config, output);
        if !FfmpegEncoder::check_ffmpeg_available(&settings.ffmpeg_path) {
            return Err(EncoderError::FfmpegNotFound.into());
        }
        let mut encoder = FfmpegEncoder::new(settings);

        // Pipeline Steps 3 and 4: Playback and output
        let report = self.play(scenes, &mut encoder, cancel).await?;

        info!(
            "🎉 Export complete: {:.2}s, {} frames, {:.1} MB",
            report.duration,
            report.frame_count,
            report.file_size as f64 / 1024.0 / 1024.0
        );
        Ok(report)
    }

    /// Play every scene through the full render path without writing a file
    pub async fn dry_run(&self, scenes: &SceneList, cancel: CancelSignal) -> Result<ExportReport> {
        info!("Dry run of \"{}\" ({} scenes)", scenes.title(), scenes.len());
        self.config.validate()?;

        let video = &self.config.video;
        let mut encoder = MemoryEncoder::new(video.width, video.height, self.config.audio.format());
        let report = self.play(scenes, &mut encoder, cancel).await?;

        info!(
            "Dry run complete: {:.2}s, {} frames",
            report.duration, report.frame_count
        );
        Ok(report)
    }

    async fn play<E: TimelineEncoder>(
        &self,
        scenes: &SceneList,
        encoder: &mut E,
        cancel: CancelSignal,
    ) -> Result<ExportReport> {
        let mut player = ScenePlayer::new(&self.config, Arc::clone(&self.loader))?;
        if let Some(progress) = &self.progress {
            let progress = Arc::clone(progress);
            player = player.with_progress(Box::new(move |p| progress(p)));
        }

        let mut device = OfflineDevice::new(self.config.video.fps, self.config.audio.format());
        debug!(
            "Offline device at {} fps, {} Hz x {}",
            self.config.video.fps, self.config.audio.sample_rate, self.config.audio.channels
        );

        player.run(scenes, &mut device, encoder, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CompositorError, ConfigError};
    use crate::player::{cancel_pair, ExportStage};
    use crate::scene::Scene;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    fn small_config() -> Config {
        let mut config = Config::default();
        config.video.width = 64;
        config.video.height = 36;
        config.video.fps = 10;
        config.video.render_threads = 1;
        config.audio.sample_rate = 8_000;
        config.audio.channels = 1;
        // Too small for a caption box
        config.caption.enabled = false;
        config
    }

    fn write_wav(path: &Path, seconds: f64, sample_rate: u32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let samples = (seconds * sample_rate as f64).round() as usize * channels as usize;
        for i in 0..samples {
            writer.write_sample(((i % 50) as i16 - 25) * 200).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// Two real scenes on disk; the second has stereo 16 kHz narration
    fn fixture() -> (TempDir, SceneList) {
        let dir = tempdir().unwrap();
        let mut list = SceneList::new("fixture");

        for (i, (seconds, rate, channels)) in [(0.5, 8_000, 1), (0.7, 16_000, 2)].into_iter().enumerate() {
            let image_path = dir.path().join(format!("{:02}_scene.png", i + 1));
            let audio_path = dir.path().join(format!("{:02}_scene.wav", i + 1));
            image::RgbImage::from_pixel(40, 30, image::Rgb([30, 60, 90]))
                .save(&image_path)
                .unwrap();
            write_wav(&audio_path, seconds, rate, channels);

            list.add_scene(Scene::new(i as u32 + 1, image_path, audio_path, "Hello there, and welcome."));
        }

        (dir, list)
    }

    #[tokio::test]
    async fn test_dry_run_follows_audio() {
        let (_dir, list) = fixture();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();

        let compositor = SceneCompositor::new(small_config())
            .with_progress(move |p| sink.lock().unwrap().push(p.stage));

        let report = compositor.dry_run(&list, CancelSignal::never()).await.unwrap();

        assert!((report.duration - 1.2).abs() < 1e-6);
        assert!(report.output.is_none());
        assert_eq!(report.scenes.len(), 2);
        assert!((report.scenes[1].audio_duration - 0.7).abs() < 1e-6);
        assert_eq!(stages.lock().unwrap().last(), Some(&ExportStage::Complete));
    }

    #[tokio::test]
    async fn test_missing_image_fails_with_scene_index() {
        let (dir, mut list) = fixture();
        list.add_scene(Scene::new(
            3,
            dir.path().join("03_missing.png"),
            dir.path().join("01_scene.wav"),
            "",
        ));

        let compositor = SceneCompositor::new(small_config());
        let err = compositor.dry_run(&list, CancelSignal::never()).await.unwrap_err();

        assert_eq!(err.scene_index(), Some(2));
        assert!(err.user_message().contains("03_missing.png"));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_rendering() {
        let (_dir, list) = fixture();
        let mut config = small_config();
        config.video.width = 63;

        let result = SceneCompositor::new(config).dry_run(&list, CancelSignal::never()).await;
        assert!(matches!(result, Err(CompositorError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreadable_caption_font_rejected() {
        let (dir, list) = fixture();
        let mut config = small_config();
        config.caption.enabled = true;
        config.caption.font_path = Some(dir.path().join("missing.ttf"));

        let result = SceneCompositor::new(config).dry_run(&list, CancelSignal::never()).await;
        assert!(matches!(
            result,
            Err(CompositorError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_export_writes_nothing() {
        let (dir, list) = fixture();
        let output = dir.path().join("out.mp4");
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let result = SceneCompositor::new(small_config()).export(&list, &output, signal).await;

        match result {
            Err(e) if e.is_cancelled() => {}
            Err(CompositorError::Encoder(EncoderError::FfmpegNotFound)) => {}
            other => panic!("unexpected result: {:?}", other.map(|r| r.frame_count)),
        }
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_export_writes_video() {
        if !FfmpegEncoder::check_ffmpeg_available(&PathBuf::from("ffmpeg")) {
            eprintln!("ffmpeg not available, skipping");
            return;
        }

        let (dir, list) = fixture();
        let output = dir.path().join("out").join("fixture.mp4");

        let report = SceneCompositor::new(small_config())
            .export(&list, &output, CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(report.output.as_deref(), Some(output.as_path()));
        assert!(report.file_size > 0);
        assert!((report.duration - 1.2).abs() < 1e-6);
    }
}
