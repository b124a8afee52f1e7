use tracing::debug;

use crate::audio::AudioFormat;
use crate::error::EncoderError;
use crate::render::Frame;

use super::{AudioDestination, EncodedVideo, TimelineEncoder};

/// Keeps the capture in memory instead of writing a file.
///
/// Only counts and the most recent frame are retained, so it is cheap enough
/// for dry runs of full-length timelines.
#[derive(Debug)]
pub struct MemoryEncoder {
    width: u32,
    height: u32,
    format: AudioFormat,
    started: bool,
    finalized: bool,
    discarded: bool,
    frame_count: u64,
    audio_samples: u64,
    last_frame: Option<Frame>,
}

impl MemoryEncoder {
    pub fn new(width: u32, height: u32, format: AudioFormat) -> Self {
        Self {
            width,
            height,
            format,
            started: false,
            finalized: false,
            discarded: false,
            frame_count: 0,
            audio_samples: 0,
            last_frame: None,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Audio received so far, in sample frames
    pub fn audio_frames(&self) -> u64 {
        self.audio_samples / self.format.channels as u64
    }

    pub fn audio_duration(&self) -> f64 {
        self.audio_frames() as f64 / self.format.sample_rate as f64
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded
    }
}

impl AudioDestination for MemoryEncoder {
    fn audio_format(&self) -> AudioFormat {
        self.format
    }

    fn write_audio(&mut self, samples: &[f32]) -> Result<(), EncoderError> {
        self.audio_samples += samples.len() as u64;
        Ok(())
    }
}

impl TimelineEncoder for MemoryEncoder {
    fn start(&mut self) -> Result<(), EncoderError> {
        self.started = true;
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> Result<(), EncoderError> {
        if !self.started || self.finalized || self.discarded {
            return Err(EncoderError::NotStarted);
        }

        if (frame.width(), frame.height()) != (self.width, self.height) {
            return Err(EncoderError::FrameSize {
                got: (frame.width(), frame.height()),
                expected: (self.width, self.height),
            });
        }

        self.frame_count += 1;
        match &mut self.last_frame {
            Some(last) => last.copy_from(frame),
            None => self.last_frame = Some(frame.clone()),
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<EncodedVideo, EncoderError> {
        if !self.started || self.discarded {
            return Err(EncoderError::NotStarted);
        }
        self.finalized = true;

        debug!(
            "Memory capture finalized: {} frames, {:.3}s audio",
            self.frame_count,
            self.audio_duration()
        );

        Ok(EncodedVideo {
            path: None,
            duration: self.audio_duration(),
            frame_count: self.frame_count,
            file_size: 0,
        })
    }

    fn discard(&mut self) {
        self.discarded = true;
        self.last_frame = None;
    }
}
