//! # Timeline Encoder
//!
//! Captures the continuous frame stream and the concatenated scene audio into
//! one output file. Export is all-or-nothing: an encoder that is discarded, or
//! whose finalize fails, leaves nothing at the output path.

mod ffmpeg;
mod memory;

use std::path::PathBuf;

use crate::audio::AudioFormat;
use crate::error::EncoderError;
use crate::render::Frame;

pub use ffmpeg::{FfmpegEncoder, FfmpegSettings};
pub use memory::MemoryEncoder;

/// Shared audio mix destination. Scenes write into it one after another.
pub trait AudioDestination {
    /// Sample layout the destination expects
    fn audio_format(&self) -> AudioFormat;

    /// Append interleaved samples in [`AudioDestination::audio_format`]
    fn write_audio(&mut self, samples: &[f32]) -> Result<(), EncoderError>;
}

/// Start/push/finalize capture of a whole timeline
pub trait TimelineEncoder: AudioDestination {
    /// Begin capturing. Called once before the first scene plays.
    fn start(&mut self) -> Result<(), EncoderError>;

    /// Append one rendered frame
    fn push_frame(&mut self, frame: &Frame) -> Result<(), EncoderError>;

    /// Stop capturing and produce the output file
    fn finalize(&mut self) -> Result<EncodedVideo, EncoderError>;

    /// Stop capturing and throw away everything captured so far
    fn discard(&mut self);
}

/// Represents an encoded video output
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub path: Option<PathBuf>,
    /// Duration of the audio track, which defines the video's duration
    pub duration: f64,
    pub frame_count: u64,
    pub file_size: u64,
}
