use serde::{Deserialize, Serialize};

/// Sample layout of a clip or of the export's mix destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

/// Decoded narration audio
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Interleaved samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// A silent clip lasting `duration` seconds
    pub fn silence(duration: f64, format: AudioFormat) -> Self {
        let frames = (duration.max(0.0) * format.sample_rate as f64).round() as usize;
        Self::new(
            vec![0.0; frames * format.channels as usize],
            format.sample_rate,
            format.channels,
        )
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Number of sample frames (one sample per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Interleaved samples of frames `start..end`
    pub fn frames(&self, start: usize, end: usize) -> &[f32] {
        let channels = self.channels as usize;
        let end = end.min(self.frame_count());
        let start = start.min(end);
        &self.samples[start * channels..end * channels]
    }

    /// Get mono mix of all channels
    pub fn mono_samples(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks(self.channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / self.channels as f32)
            .collect()
    }

    /// Convert to `format`: channels are mixed down or duplicated, and the
    /// sample rate is changed by linear interpolation.
    pub fn conform(self, format: AudioFormat) -> Self {
        if self.format() == format {
            return self;
        }

        let remixed = self.remix(format.channels);
        remixed.resample(format.sample_rate)
    }

    fn remix(self, channels: u16) -> Self {
        if self.channels == channels {
            return self;
        }

        let mono = self.mono_samples();
        let samples = if channels == 1 {
            mono
        } else {
            mono.iter()
                .flat_map(|&s| std::iter::repeat(s).take(channels as usize))
                .collect()
        };

        Self::new(samples, self.sample_rate, channels)
    }

    fn resample(self, sample_rate: u32) -> Self {
        if self.sample_rate == sample_rate || self.sample_rate == 0 {
            return Self::new(self.samples, sample_rate, self.channels);
        }

        let channels = self.channels as usize;
        let in_frames = self.frame_count();
        let out_frames = (self.duration() * sample_rate as f64).round() as usize;
        let step = self.sample_rate as f64 / sample_rate as f64;

        let mut samples = Vec::with_capacity(out_frames * channels);
        for frame in 0..out_frames {
            let position = frame as f64 * step;
            let index = position.floor() as usize;
            let frac = (position - index as f64) as f32;
            let next = (index + 1).min(in_frames.saturating_sub(1));
            let index = index.min(in_frames.saturating_sub(1));

            for ch in 0..channels {
                let a = self.samples[index * channels + ch];
                let b = self.samples[next * channels + ch];
                samples.push(a + (b - a) * frac);
            }
        }

        Self::new(samples, sample_rate, self.channels)
    }
}
