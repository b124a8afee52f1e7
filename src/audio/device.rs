use std::sync::Arc;

use tracing::debug;

use crate::audio::types::{AudioClip, AudioFormat};
use crate::encoder::AudioDestination;
use crate::error::EncoderError;

/// Audio output plus display-frame pacing, as seen by the scene player.
///
/// The player never keeps time itself: scene progress is always derived from
/// [`PlaybackDevice::now`] relative to the start time returned by
/// [`PlaybackDevice::connect`].
pub trait PlaybackDevice {
    /// Monotonic device time in seconds
    fn now(&self) -> f64;

    /// Connect `clip` to the mix destination and start playing it.
    /// Returns the device time at which the clip starts.
    fn connect(&mut self, clip: Arc<AudioClip>) -> f64;

    /// Whether the connected source has played to its end
    fn source_ended(&self) -> bool;

    /// Stop the connected source immediately and release it
    fn disconnect(&mut self);

    /// Wait for the next display frame. Audio played during the interval is
    /// delivered to `destination`.
    fn wait_frame(&mut self, destination: &mut dyn AudioDestination) -> Result<(), EncoderError>;
}

struct ActiveSource {
    clip: Arc<AudioClip>,
    /// Destination sample frame at which the clip starts
    start_frame: u64,
}

impl ActiveSource {
    fn end_frame(&self) -> u64 {
        self.start_frame + self.clip.frame_count() as u64
    }
}

/// Renders as fast as possible instead of in real time.
///
/// Each tick advances the clock by exactly one frame interval. The audio
/// position is the number of sample frames delivered to the destination, and
/// each new source is scheduled at the end of the audio emitted so far, so
/// consecutive clips are concatenated without gaps.
pub struct OfflineDevice {
    fps: u32,
    format: AudioFormat,
    tick: u64,
    emitted_frames: u64,
    source: Option<ActiveSource>,
}

impl OfflineDevice {
    pub fn new(fps: u32, format: AudioFormat) -> Self {
        Self {
            fps: fps.max(1),
            format,
            tick: 0,
            emitted_frames: 0,
            source: None,
        }
    }

    /// Ticks elapsed since the device was created
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }
}

impl PlaybackDevice for OfflineDevice {
    fn now(&self) -> f64 {
        self.tick as f64 / self.fps as f64
    }

    fn connect(&mut self, clip: Arc<AudioClip>) -> f64 {
        let clip = if clip.format() == self.format {
            clip
        } else {
            Arc::new((*clip).clone().conform(self.format))
        };

        let start_frame = self.emitted_frames;
        debug!(
            "Connecting {:.2}s source at audio frame {} (tick {})",
            clip.duration(),
            start_frame,
            self.tick
        );
        self.source = Some(ActiveSource { clip, start_frame });
        start_frame as f64 / self.format.sample_rate as f64
    }

    fn source_ended(&self) -> bool {
        self.source
            .as_ref()
            .map_or(true, |source| self.emitted_frames >= source.end_frame())
    }

    fn disconnect(&mut self) {
        self.source = None;
    }

    fn wait_frame(&mut self, destination: &mut dyn AudioDestination) -> Result<(), EncoderError> {
        self.tick += 1;

        let Some(source) = &self.source else {
            return Ok(());
        };

        let target = (self.now() * self.format.sample_rate as f64).round() as u64;
        let until = target.min(source.end_frame());
        if until > self.emitted_frames {
            let from = (self.emitted_frames - source.start_frame) as usize;
            let to = (until - source.start_frame) as usize;
            destination.write_audio(source.clip.frames(from, to))?;
            self.emitted_frames = until;
        }

        Ok(())
    }
}
