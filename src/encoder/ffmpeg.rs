use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::audio::AudioFormat;
use crate::config::Config;
use crate::error::EncoderError;
use crate::render::Frame;

use super::{AudioDestination, EncodedVideo, TimelineEncoder};

/// Everything the ffmpeg capture needs to know about the output
#[derive(Debug, Clone)]
pub struct FfmpegSettings {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
    pub codec: String,
    pub audio: AudioFormat,
    pub ffmpeg_path: PathBuf,
    pub overwrite: bool,
}

impl FfmpegSettings {
    pub fn from_config(config: &Config, output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            width: config.video.width,
            height: config.video.height,
            fps: config.video.fps,
            bitrate_kbps: config.video.bitrate_kbps,
            codec: config.video.codec.clone(),
            audio: config.audio.format(),
            ffmpeg_path: config.export.ffmpeg_path.clone(),
            overwrite: config.export.overwrite,
        }
    }
}

type WavSink = hound::WavWriter<BufWriter<File>>;

/// Streams raw RGB frames into an ffmpeg child process and records the mix
/// to a WAV file; both are muxed into the output on finalize.
///
/// Intermediate files live in a private temporary directory that is removed
/// on finalize, discard or drop.
pub struct FfmpegEncoder {
    settings: FfmpegSettings,
    temp_dir: Option<TempDir>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    wav: Option<WavSink>,
    frame_count: u64,
    audio_frames: u64,
}

impl FfmpegEncoder {
    pub fn new(settings: FfmpegSettings) -> Self {
        Self {
            settings,
            temp_dir: None,
            child: None,
            stdin: None,
            wav: None,
            frame_count: 0,
            audio_frames: 0,
        }
    }

    pub fn check_ffmpeg_available(ffmpeg: &Path) -> bool {
        Command::new(ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub fn settings(&self) -> &FfmpegSettings {
        &self.settings
    }

    fn spawn_video_process(&self, video_path: &Path) -> Result<Child, EncoderError> {
        let s = &self.settings;
        let mut cmd = Command::new(&s.ffmpeg_path);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", s.width, s.height),
            "-r",
            &s.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            &s.codec,
            "-b:v",
            &format!("{}k", s.bitrate_kbps),
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(video_path);

        cmd.spawn().map_err(|e| EncoderError::Spawn {
            reason: format!("{}: {}", s.ffmpeg_path.display(), e),
        })
    }

    fn create_wav(&self, wav_path: &Path) -> Result<WavSink, EncoderError> {
        let spec = hound::WavSpec {
            channels: self.settings.audio.channels,
            sample_rate: self.settings.audio.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        hound::WavWriter::create(wav_path, spec).map_err(|e| EncoderError::Failed {
            reason: format!("Failed to create audio track: {}", e),
        })
    }

    /// Close the frame pipe and wait for the video-only encode to finish
    fn finish_video(&mut self) -> Result<(), EncoderError> {
        drop(self.stdin.take());

        let child = self.child.take().ok_or(EncoderError::NotStarted)?;
        let output = child.wait_with_output().map_err(|e| EncoderError::Failed {
            reason: format!("Failed to wait for FFmpeg: {}", e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncoderError::Failed {
                reason: format!("FFmpeg exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(())
    }

    fn mux(&self, video_path: &Path, audio_path: &Path, muxed_path: &Path) -> Result<(), EncoderError> {
        let output = Command::new(&self.settings.ffmpeg_path)
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(video_path)
            .arg("-i")
            .arg(audio_path)
            .args(["-c:v", "copy", "-c:a", "aac", "-shortest"])
            .arg(muxed_path)
            .output()
            .map_err(|e| EncoderError::Spawn {
                reason: format!("{}: {}", self.settings.ffmpeg_path.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncoderError::Failed {
                reason: format!("FFmpeg mux failed: {}", stderr.trim()),
            });
        }

        Ok(())
    }

    fn publish(&self, muxed_path: &Path) -> Result<u64, EncoderError> {
        let output = &self.settings.output;
        publish_file(muxed_path, output).map_err(|e| EncoderError::Failed {
            reason: format!("Failed to write {}: {}", output.display(), e),
        })
    }

    fn finish(&mut self) -> Result<EncodedVideo, EncoderError> {
        let temp_path = self
            .temp_dir
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .ok_or(EncoderError::NotStarted)?;

        self.finish_video()?;

        let wav = self.wav.take().ok_or(EncoderError::NotStarted)?;
        wav.finalize().map_err(|e| EncoderError::Failed {
            reason: format!("Failed to finish audio track: {}", e),
        })?;

        debug!(
            "Muxing {} frames with {} audio frames",
            self.frame_count, self.audio_frames
        );

        let muxed_path = temp_path.join("muxed.mp4");
        self.mux(
            &temp_path.join("video_only.mp4"),
            &temp_path.join("narration.wav"),
            &muxed_path,
        )?;

        let file_size = self.publish(&muxed_path)?;
        let duration = self.audio_frames as f64 / self.settings.audio.sample_rate as f64;

        info!(
            "Wrote {} ({:.2}s, {:.1} MB)",
            self.settings.output.display(),
            duration,
            file_size as f64 / 1024.0 / 1024.0
        );

        Ok(EncodedVideo {
            path: Some(self.settings.output.clone()),
            duration,
            frame_count: self.frame_count,
            file_size,
        })
    }

    fn cleanup(&mut self) {
        if let Some(dir) = self.temp_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("Failed to remove temporary directory {:?}: {}", path, e);
            }
        }
    }
}

/// Put `finished` at `output` without ever exposing a partial file there.
///
/// A plain rename is tried first. When that fails (the temp directory is on
/// another filesystem) the file is copied into a staging file beside
/// `output` and renamed into place once complete.
fn publish_file(finished: &Path, output: &Path) -> std::io::Result<u64> {
    let parent = match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent.to_path_buf()
        }
        None => PathBuf::from("."),
    };

    if std::fs::rename(finished, output).is_ok() {
        return std::fs::metadata(output).map(|m| m.len());
    }

    let mut staged = tempfile::Builder::new()
        .prefix(".scene_compositor_")
        .suffix(".part")
        .tempfile_in(&parent)?;
    let mut source = File::open(finished)?;
    std::io::copy(&mut source, staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    let file = staged.persist(output).map_err(|e| e.error)?;
    file.metadata().map(|m| m.len())
}

impl AudioDestination for FfmpegEncoder {
    fn audio_format(&self) -> AudioFormat {
        self.settings.audio
    }

    fn write_audio(&mut self, samples: &[f32]) -> Result<(), EncoderError> {
        let wav = self.wav.as_mut().ok_or(EncoderError::NotStarted)?;

        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            wav.write_sample(value).map_err(|e| EncoderError::Write {
                reason: format!("audio track: {}", e),
            })?;
        }

        self.audio_frames += (samples.len() / self.settings.audio.channels.max(1) as usize) as u64;
        Ok(())
    }
}

impl TimelineEncoder for FfmpegEncoder {
    fn start(&mut self) -> Result<(), EncoderError> {
        if !self.settings.overwrite && self.settings.output.exists() {
            return Err(EncoderError::Failed {
                reason: format!("Output file {} already exists", self.settings.output.display()),
            });
        }

        if !Self::check_ffmpeg_available(&self.settings.ffmpeg_path) {
            return Err(EncoderError::FfmpegNotFound);
        }

        let temp_dir = tempfile::Builder::new()
            .prefix("scene_compositor_")
            .tempdir()
            .map_err(|e| EncoderError::Failed {
                reason: format!("Failed to create temporary directory: {}", e),
            })?;

        let video_path = temp_dir.path().join("video_only.mp4");
        let wav_path = temp_dir.path().join("narration.wav");

        let mut child = self.spawn_video_process(&video_path)?;
        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = child.kill();
                return Err(EncoderError::Spawn {
                    reason: "FFmpeg stdin was not captured".to_string(),
                });
            }
        };

        self.wav = Some(self.create_wav(&wav_path)?);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.temp_dir = Some(temp_dir);
        self.frame_count = 0;
        self.audio_frames = 0;

        info!(
            "Capturing {}x{} @ {} fps ({}, {} kbps)",
            self.settings.width,
            self.settings.height,
            self.settings.fps,
            self.settings.codec,
            self.settings.bitrate_kbps
        );
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> Result<(), EncoderError> {
        let expected = (self.settings.width, self.settings.height);
        if (frame.width(), frame.height()) != expected {
            return Err(EncoderError::FrameSize {
                got: (frame.width(), frame.height()),
                expected,
            });
        }

        let stdin = self.stdin.as_mut().ok_or(EncoderError::NotStarted)?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| EncoderError::Write {
                reason: format!("frame {}: {}", self.frame_count, e),
            })?;

        self.frame_count += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<EncodedVideo, EncoderError> {
        let result = self.finish();
        if result.is_err() {
            self.discard();
        } else {
            self.cleanup();
        }
        result
    }

    fn discard(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.wav = None;
        self.cleanup();
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.discard();
    }
}
