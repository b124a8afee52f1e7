use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::types::AudioClip;
use crate::error::AssetError;

/// Narration audio decoder supporting multiple formats
pub struct AudioLoader;

impl AudioLoader {
    /// Decode an audio file into interleaved f32 samples.
    ///
    /// Blocking; callers on the async runtime run this on a blocking task.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AudioClip, AssetError> {
        let path = path.as_ref();
        let extension = Self::detect_format(path).unwrap_or_default();

        let clip = match extension.as_str() {
            "wav" => Self::load_wav(path)?,
            "mp3" | "flac" | "ogg" | "m4a" | "aac" => Self::load_with_symphonia(path)?,
            _ => {
                return Err(AssetError::UnsupportedFormat { format: extension });
            }
        };

        debug!(
            "Decoded {:?}: {:.2}s, {} Hz, {} channels",
            path,
            clip.duration(),
            clip.sample_rate,
            clip.channels
        );
        Ok(clip)
    }

    /// Load WAV files using the hound crate (most reliable for WAV)
    fn load_wav(path: &Path) -> Result<AudioClip, AssetError> {
        let load_failed = || AssetError::AudioLoad {
            path: path.display().to_string(),
        };

        let reader = hound::WavReader::open(path).map_err(|_| load_failed())?;

        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| AssetError::Decode { reason: format!("{}: {}", path.display(), e) })?,
            hound::SampleFormat::Int => {
                let bit_depth = spec.bits_per_sample;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|s| Self::int_to_float(s, bit_depth)))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| AssetError::Decode { reason: format!("{}: {}", path.display(), e) })?
            }
        };

        Ok(AudioClip::new(samples, spec.sample_rate, spec.channels))
    }

    /// Load compressed formats using Symphonia
    fn load_with_symphonia(path: &Path) -> Result<AudioClip, AssetError> {
        let load_failed = || AssetError::AudioLoad {
            path: path.display().to_string(),
        };

        let file = File::open(path).map_err(|_| load_failed())?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .map_err(|_| load_failed())?;

        let mut format = probed.format;

        // First track with a decodable codec
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(load_failed)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params.sample_rate.ok_or_else(|| AssetError::Decode {
            reason: format!("{}: no sample rate", path.display()),
        })?;

        let mut channels = codec_params.channels.map(|c| c.count() as u16);

        let dec_opts: DecoderOptions = Default::default();
        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &dec_opts)
            .map_err(|e| AssetError::Decode {
                reason: format!("{}: {}", path.display(), e),
            })?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                // End of stream
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => {
                    return Err(AssetError::Decode {
                        reason: format!("{}: {}", path.display(), e),
                    });
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    channels.get_or_insert(decoded.spec().channels.count() as u16);
                    Self::convert_audio_buffer_to_f32(&decoded, &mut samples);
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping corrupt packet in {:?}: {}", path, e);
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => {
                    return Err(AssetError::Decode {
                        reason: format!("{}: {}", path.display(), e),
                    });
                }
            }
        }

        let channels = channels.ok_or_else(|| AssetError::Decode {
            reason: format!("{}: no channel information", path.display()),
        })?;

        Ok(AudioClip::new(samples, sample_rate, channels))
    }

    /// Convert integer sample to float (-1.0 to 1.0).
    /// hound already re-centres unsigned 8-bit samples around zero.
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        match bit_depth {
            8 => sample as f32 / 128.0,
            16 => sample as f32 / 32768.0,
            24 => sample as f32 / 8388608.0,
            32 => sample as f32 / 2147483648.0,
            _ => sample as f32 / 32768.0,
        }
    }

    /// Interleave a Symphonia planar buffer into `output`
    fn convert_audio_buffer_to_f32(buffer: &AudioBufferRef, output: &mut Vec<f32>) {
        fn interleave<S: symphonia::core::sample::Sample>(
            buf: &symphonia::core::audio::AudioBuffer<S>,
            output: &mut Vec<f32>,
            convert: impl Fn(S) -> f32,
        ) {
            let channels = buf.spec().channels.count();
            for frame_idx in 0..buf.frames() {
                for ch in 0..channels {
                    output.push(convert(buf.chan(ch)[frame_idx]));
                }
            }
        }

        match buffer {
            AudioBufferRef::F32(buf) => interleave(&**buf, output, |s| s),
            AudioBufferRef::F64(buf) => interleave(&**buf, output, |s| s as f32),
            AudioBufferRef::S32(buf) => interleave(&**buf, output, |s| s as f32 / 2147483648.0),
            AudioBufferRef::S16(buf) => interleave(&**buf, output, |s| s as f32 / 32768.0),
            AudioBufferRef::U8(buf) => interleave(&**buf, output, |s| (s as f32 - 128.0) / 128.0),
            _ => {
                warn!("Unsupported audio buffer format, skipping packet");
            }
        }
    }

    /// Detect audio format from file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check if a file format is supported
    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac"
        )
    }
}
