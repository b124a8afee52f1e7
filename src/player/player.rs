use std::sync::Arc;
use std::time::Duration;

use tokio::task;
use tracing::{debug, info, warn};

use crate::audio::{AudioClip, PlaybackDevice};
use crate::config::Config;
use crate::encoder::TimelineEncoder;
use crate::error::{AssetError, CompositorError, ManifestError, Result, SceneError};
use crate::motion::MotionEngine;
use crate::player::assets::AssetLoader;
use crate::player::cancel::CancelSignal;
use crate::player::state::{
    ExportProgress, ExportReport, ExportStage, ProgressCallback, RunState, ScenePhase, SceneReport,
};
use crate::render::{Frame, FrameRenderer, SourceImage};
use crate::scene::{Scene, SceneList};
use crate::subtitle::{caption_index, Segmenter};

/// Plays scenes strictly one after another, rendering every frame from the
/// playback device's clock and feeding frames and audio to the encoder.
pub struct ScenePlayer {
    motion: MotionEngine,
    renderer: FrameRenderer,
    segmenter: Segmenter,
    loader: Arc<dyn AssetLoader>,
    asset_timeout: Option<Duration>,
    progress: Option<ProgressCallback>,
    frame: Frame,
    state: RunState,
    phase: ScenePhase,
}

impl ScenePlayer {
    pub fn new(config: &Config, loader: Arc<dyn AssetLoader>) -> Result<Self> {
        let renderer = FrameRenderer::new(config)?;
        let frame = renderer.new_frame();

        Ok(Self {
            motion: MotionEngine::new(config.motion.clone(), config.video.width, config.video.height),
            renderer,
            segmenter: Segmenter::new(config.caption.max_chars_per_line),
            loader,
            asset_timeout: config.export.asset_timeout_secs.map(Duration::from_secs_f64),
            progress: None,
            frame,
            state: RunState::Idle,
            phase: ScenePhase::Idle,
        })
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Play every scene in order. On any failure the encoder discards its
    /// partial output and the error names the scene that caused it.
    pub async fn run<D, E>(
        &mut self,
        scenes: &SceneList,
        device: &mut D,
        encoder: &mut E,
        mut cancel: CancelSignal,
    ) -> Result<ExportReport>
    where
        D: PlaybackDevice,
        E: TimelineEncoder,
    {
        if scenes.is_empty() {
            return Err(ManifestError::NoScenes {
                path: scenes.title().to_string(),
            }
            .into());
        }
        self.renderer
            .captions()
            .ensure_drawable(scenes.iter().map(|scene| scene.script.as_str()))?;

        self.state = RunState::Running;
        if let Err(e) = encoder.start() {
            self.state = RunState::Failed;
            return Err(e.into());
        }

        let total = scenes.len();
        let mut reports = Vec::with_capacity(total);
        let mut frames_rendered = 0;

        for (index, scene) in scenes.iter().enumerate() {
            info!("Scene {}/{}: {}", index + 1, total, scene.name);

            match self.play_scene(index, scene, device, encoder, &mut cancel).await {
                Ok(report) => {
                    frames_rendered += report.frames;
                    reports.push(report);
                    self.report_progress(index + 1, total, frames_rendered, ExportStage::Rendering);
                }
                Err(e) => {
                    device.disconnect();
                    encoder.discard();
                    self.state = RunState::Failed;

                    if matches!(e, SceneError::Cancelled) {
                        warn!("Export cancelled during scene {}", index + 1);
                    } else {
                        warn!("Scene {} failed while {:?}: {}", index + 1, self.phase, e);
                    }
                    return Err(CompositorError::scene(index, e));
                }
            }
        }

        self.report_progress(total, total, frames_rendered, ExportStage::Finalizing);

        let video = match encoder.finalize() {
            Ok(video) => video,
            Err(e) => {
                encoder.discard();
                self.state = RunState::Failed;
                return Err(e.into());
            }
        };

        self.state = RunState::Complete;
        self.report_progress(total, total, frames_rendered, ExportStage::Complete);

        Ok(ExportReport {
            output: video.path,
            duration: video.duration,
            frame_count: video.frame_count,
            file_size: video.file_size,
            scenes: reports,
        })
    }

    async fn play_scene<D, E>(
        &mut self,
        index: usize,
        scene: &Scene,
        device: &mut D,
        encoder: &mut E,
        cancel: &mut CancelSignal,
    ) -> std::result::Result<SceneReport, SceneError>
    where
        D: PlaybackDevice,
        E: TimelineEncoder,
    {
        if cancel.is_cancelled() {
            return Err(SceneError::Cancelled);
        }

        self.phase = ScenePhase::Loading;
        let (image, clip) = self.load_assets(scene, cancel).await?;

        let captions = self.segmenter.segment(&scene.script);
        let duration = clip.duration();
        debug!(
            "Scene {} loaded: {:.2}s audio, {} caption chunks",
            index + 1,
            duration,
            captions.len()
        );

        self.phase = ScenePhase::Playing;
        let start = device.connect(Arc::new(clip));
        let mut frames = 0u64;

        loop {
            if cancel.is_cancelled() {
                device.disconnect();
                return Err(SceneError::Cancelled);
            }

            let elapsed = device.now() - start;
            let progress = if duration > 0.0 {
                (elapsed / duration).clamp(0.0, 1.0)
            } else {
                1.0
            };

            let transform = self.motion.transform(scene.effect.as_ref(), progress);
            let caption = captions
                .get(caption_index(progress, captions.len()))
                .map(String::as_str);

            self.renderer.render(&mut self.frame, &image, transform, caption);
            encoder.push_frame(&self.frame)?;
            frames += 1;

            device.wait_frame(encoder)?;
            task::yield_now().await;

            if progress >= 1.0 {
                break;
            }
        }

        // Hold the final frame until the audio has fully played
        self.phase = ScenePhase::Complete;
        while !device.source_ended() {
            if cancel.is_cancelled() {
                device.disconnect();
                return Err(SceneError::Cancelled);
            }

            encoder.push_frame(&self.frame)?;
            frames += 1;
            device.wait_frame(encoder)?;
            task::yield_now().await;
        }
        device.disconnect();

        Ok(SceneReport {
            index,
            position: scene.position,
            audio_duration: duration,
            frames,
            captions: captions.len(),
        })
    }

    /// Decode image and audio concurrently, raced against cancellation and the
    /// optional asset timeout
    async fn load_assets(
        &self,
        scene: &Scene,
        cancel: &mut CancelSignal,
    ) -> std::result::Result<(SourceImage, AudioClip), SceneError> {
        let image_loader = Arc::clone(&self.loader);
        let audio_loader = Arc::clone(&self.loader);
        let image_path = scene.image.clone();
        let audio_path = scene.audio.clone();

        let load = async move {
            let image = task::spawn_blocking(move || image_loader.load_image(&image_path));
            let audio = task::spawn_blocking(move || audio_loader.load_audio(&audio_path));

            let (image, audio) = tokio::try_join!(image, audio).map_err(|e| AssetError::Decode {
                reason: format!("asset task failed: {}", e),
            })?;
            Ok::<_, SceneError>((image?, audio?))
        };

        let timeout = self.asset_timeout;
        let guarded = async move {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, load).await {
                    Ok(result) => result,
                    Err(_) => Err(SceneError::SyncTimeout {
                        waited_secs: limit.as_secs_f64(),
                    }),
                },
                None => load.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SceneError::Cancelled),
            result = guarded => result,
        }
    }

    fn report_progress(&self, completed: usize, total: usize, frames: u64, stage: ExportStage) {
        if let Some(callback) = &self.progress {
            callback(ExportProgress {
                progress: completed as f64 / total.max(1) as f64,
                scenes_completed: completed,
                total_scenes: total,
                frames_rendered: frames,
                stage,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFormat, OfflineDevice};
    use crate::encoder::{AudioDestination, MemoryEncoder};
    use crate::error::EncoderError;
    use crate::motion::{EffectSpec, EffectType};
    use crate::player::cancel::{cancel_pair, CancelHandle};
    use image::{Rgb, RgbImage};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    const FPS: u32 = 10;
    const FORMAT: AudioFormat = AudioFormat {
        sample_rate: 8_000,
        channels: 1,
    };

    type EventLog = Arc<Mutex<Vec<String>>>;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.video.width = 32;
        config.video.height = 18;
        config.video.fps = FPS;
        config.video.render_threads = 1;
        config.audio.sample_rate = FORMAT.sample_rate;
        config.audio.channels = FORMAT.channels;
        // Too small for a caption box
        config.caption.enabled = false;
        config
    }

    /// Serves synthetic assets keyed by path
    #[derive(Default)]
    struct ScriptedLoader {
        durations: HashMap<PathBuf, f64>,
        broken_images: Vec<PathBuf>,
        audio_delay: Option<Duration>,
        log: EventLog,
    }

    impl AssetLoader for ScriptedLoader {
        fn load_image(&self, path: &Path) -> std::result::Result<SourceImage, AssetError> {
            self.log.lock().unwrap().push(format!("load {}", path.display()));
            if self.broken_images.iter().any(|p| p == path) {
                return Err(AssetError::ImageLoad {
                    path: path.display().to_string(),
                });
            }
            Ok(SourceImage::new(RgbImage::from_pixel(16, 9, Rgb([90, 120, 150]))))
        }

        fn load_audio(&self, path: &Path) -> std::result::Result<AudioClip, AssetError> {
            if let Some(delay) = self.audio_delay {
                std::thread::sleep(delay);
            }
            let duration = self.durations.get(path).copied().ok_or_else(|| AssetError::AudioLoad {
                path: path.display().to_string(),
            })?;
            Ok(AudioClip::silence(duration, FORMAT))
        }
    }

    /// Offline device that logs source changes and can cancel at a given tick
    struct ObservedDevice {
        inner: OfflineDevice,
        log: EventLog,
        cancel_at: Option<(u64, CancelHandle)>,
    }

    impl ObservedDevice {
        fn new(log: EventLog) -> Self {
            Self {
                inner: OfflineDevice::new(FPS, FORMAT),
                log,
                cancel_at: None,
            }
        }
    }

    impl PlaybackDevice for ObservedDevice {
        fn now(&self) -> f64 {
            self.inner.now()
        }

        fn connect(&mut self, clip: Arc<AudioClip>) -> f64 {
            self.log.lock().unwrap().push("connect".to_string());
            self.inner.connect(clip)
        }

        fn source_ended(&self) -> bool {
            self.inner.source_ended()
        }

        fn disconnect(&mut self) {
            if self.inner.is_connected() {
                self.log.lock().unwrap().push("disconnect".to_string());
            }
            self.inner.disconnect();
        }

        fn wait_frame(&mut self, destination: &mut dyn AudioDestination) -> std::result::Result<(), EncoderError> {
            self.inner.wait_frame(destination)?;
            if let Some((tick, handle)) = &self.cancel_at {
                if self.inner.ticks() == *tick {
                    handle.cancel();
                }
            }
            Ok(())
        }
    }

    fn scenes(durations: &[f64]) -> (SceneList, HashMap<PathBuf, f64>) {
        let mut map = HashMap::new();
        let list = durations
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                let audio = PathBuf::from(format!("{}.wav", i + 1));
                map.insert(audio.clone(), d);
                Scene::new(i as u32 + 1, format!("{}.png", i + 1), audio, "First part, then the second part.")
                    .with_effect(EffectSpec::new(EffectType::ZoomInSlow))
            })
            .collect();
        (list, map)
    }

    fn player(loader: ScriptedLoader) -> ScenePlayer {
        ScenePlayer::new(&test_config(), Arc::new(loader)).unwrap()
    }

    fn encoder() -> MemoryEncoder {
        MemoryEncoder::new(32, 18, FORMAT)
    }

    #[tokio::test]
    async fn test_total_duration_matches_audio() {
        let (list, durations) = scenes(&[3.0, 2.5, 4.0]);
        let mut player = player(ScriptedLoader {
            durations,
            ..Default::default()
        });
        let mut device = OfflineDevice::new(FPS, FORMAT);
        let mut encoder = encoder();

        let report = player
            .run(&list, &mut device, &mut encoder, CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(player.state(), RunState::Complete);
        assert!((report.duration - 9.5).abs() < 1e-9);

        // Timestamp of the last frame lands within one frame of the audio end
        let last_frame_time = (report.frame_count - 1) as f64 / FPS as f64;
        assert!((last_frame_time - 9.5).abs() <= 1.0 / FPS as f64 + 1e-9);

        assert_eq!(report.scenes.len(), 3);
        assert_eq!(report.scenes.iter().map(|s| s.frames).sum::<u64>(), report.frame_count);
        assert!(report.scenes.iter().all(|s| s.captions == 2));
        assert!(!device.is_connected());
    }

    #[tokio::test]
    async fn test_scenes_play_strictly_in_order() {
        let log: EventLog = Arc::default();
        let (list, durations) = scenes(&[0.3, 0.2, 0.4]);
        let mut player = player(ScriptedLoader {
            durations,
            log: log.clone(),
            ..Default::default()
        });
        let mut device = ObservedDevice::new(log.clone());

        player
            .run(&list, &mut device, &mut encoder(), CancelSignal::never())
            .await
            .unwrap();

        let events = log.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "load 1.png", "connect", "disconnect",
                "load 2.png", "connect", "disconnect",
                "load 3.png", "connect", "disconnect",
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_length_audio_renders_final_state() {
        let (list, durations) = scenes(&[0.0]);
        let mut player = player(ScriptedLoader {
            durations,
            ..Default::default()
        });
        let mut device = OfflineDevice::new(FPS, FORMAT);

        let report = player
            .run(&list, &mut device, &mut encoder(), CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(report.frame_count, 1);
        assert_eq!(report.duration, 0.0);
    }

    #[tokio::test]
    async fn test_asset_failure_names_scene() {
        let (list, durations) = scenes(&[0.2, 0.2, 0.2]);
        let mut player = player(ScriptedLoader {
            durations,
            broken_images: vec![PathBuf::from("2.png")],
            ..Default::default()
        });
        let mut device = OfflineDevice::new(FPS, FORMAT);
        let mut encoder = encoder();

        let err = player
            .run(&list, &mut device, &mut encoder, CancelSignal::never())
            .await
            .unwrap_err();

        assert_eq!(err.scene_index(), Some(1));
        assert!(matches!(
            err,
            CompositorError::Scene {
                source: SceneError::AssetLoad(AssetError::ImageLoad { .. }),
                ..
            }
        ));
        assert!(err.user_message().starts_with("Scene 2 failed"));
        assert_eq!(player.state(), RunState::Failed);
        assert!(encoder.is_discarded());
    }

    #[tokio::test]
    async fn test_cancel_mid_scene_stops_within_one_tick() {
        let log: EventLog = Arc::default();
        let (list, durations) = scenes(&[1.0, 1.0]);
        let mut player = player(ScriptedLoader {
            durations,
            log: log.clone(),
            ..Default::default()
        });

        let (handle, signal) = cancel_pair();
        let mut device = ObservedDevice::new(log);
        // 1.0s at 10 fps is 11 ticks for the first scene, so tick 14 is inside the second
        device.cancel_at = Some((14, handle));
        let mut encoder = encoder();

        let err = player
            .run(&list, &mut device, &mut encoder, signal)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.scene_index(), Some(1));
        assert_eq!(encoder.frame_count(), 14);
        assert!(encoder.is_discarded());
        assert!(!device.inner.is_connected());

        // No audio past the cancelling tick
        assert!(encoder.audio_frames() <= (14 * FORMAT.sample_rate / FPS) as u64);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let (list, durations) = scenes(&[0.5]);
        let mut player = player(ScriptedLoader {
            durations,
            ..Default::default()
        });
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let mut encoder = encoder();
        let err = player
            .run(&list, &mut OfflineDevice::new(FPS, FORMAT), &mut encoder, signal)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.scene_index(), Some(0));
        assert_eq!(encoder.frame_count(), 0);
    }

    #[tokio::test]
    async fn test_stalled_assets_time_out() {
        let (list, durations) = scenes(&[0.5]);
        let mut config = test_config();
        config.export.asset_timeout_secs = Some(0.02);
        let loader = ScriptedLoader {
            durations,
            audio_delay: Some(Duration::from_millis(500)),
            ..Default::default()
        };
        let mut player = ScenePlayer::new(&config, Arc::new(loader)).unwrap();

        let err = player
            .run(&list, &mut OfflineDevice::new(FPS, FORMAT), &mut encoder(), CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CompositorError::Scene {
                index: 0,
                source: SceneError::SyncTimeout { .. },
            }
        ));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_progress_reported_per_scene() {
        let seen: Arc<Mutex<Vec<(u32, ExportStage)>>> = Arc::default();
        let sink = seen.clone();

        let (list, durations) = scenes(&[0.1, 0.1, 0.1, 0.1]);
        let mut player = player(ScriptedLoader {
            durations,
            ..Default::default()
        })
        .with_progress(Box::new(move |p| sink.lock().unwrap().push((p.percent(), p.stage))));

        player
            .run(&list, &mut OfflineDevice::new(FPS, FORMAT), &mut encoder(), CancelSignal::never())
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (25, ExportStage::Rendering),
                (50, ExportStage::Rendering),
                (75, ExportStage::Rendering),
                (100, ExportStage::Rendering),
                (100, ExportStage::Finalizing),
                (100, ExportStage::Complete),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_scene_list_is_rejected() {
        let mut player = player(ScriptedLoader::default());
        let result = player
            .run(&SceneList::new("empty"), &mut OfflineDevice::new(FPS, FORMAT), &mut encoder(), CancelSignal::never())
            .await;

        assert!(matches!(
            result,
            Err(CompositorError::Manifest(ManifestError::NoScenes { .. }))
        ));
    }
}
