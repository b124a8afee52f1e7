use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    audio::AudioFormat,
    error::{ConfigError, Result},
    motion::MotionConfig,
    subtitle::DEFAULT_MAX_CHARS_PER_LINE,
};

/// Main configuration for the Scene Compositor
///
/// Everything the compositor needs is carried here and handed over at
/// construction; nothing is read from process-wide state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output video settings
    pub video: VideoConfig,

    /// Mix destination settings
    pub audio: AudioConfig,

    /// Caption segmentation and overlay settings
    pub caption: CaptionConfig,

    /// Camera motion tuning
    pub motion: MotionConfig,

    /// Export behaviour (encoder binary, timeouts)
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.video.validate()?;
        self.audio.validate()?;
        self.caption.validate()?;
        self.motion.validate()?;
        self.export.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Output video configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Canonical output width in pixels
    pub width: u32,

    /// Canonical output height in pixels
    pub height: u32,

    /// Frames per second; also the tick rate of the render loop
    pub fps: u32,

    /// Target video bitrate in kbit/s
    pub bitrate_kbps: u32,

    /// FFmpeg video codec
    pub codec: String,

    /// Number of threads used to resample a frame
    pub render_threads: usize,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 60,
            bitrate_kbps: 20_000,
            codec: "libx264".to_string(),
            render_threads: num_cpus::get(),
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            // yuv420p output needs even dimensions
            return Err(invalid("video.resolution", format!("{}x{}", self.width, self.height)).into());
        }

        if self.fps == 0 {
            return Err(invalid("video.fps", self.fps).into());
        }

        if self.bitrate_kbps == 0 {
            return Err(invalid("video.bitrate_kbps", self.bitrate_kbps).into());
        }

        if self.render_threads == 0 {
            return Err(invalid("video.render_threads", self.render_threads).into());
        }

        Ok(())
    }

    /// Duration of one tick in seconds
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.fps as f64
    }
}

/// Audio mix destination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate every clip is conformed to (Hz)
    pub sample_rate: u32,

    /// Channel count every clip is conformed to
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", self.sample_rate).into());
        }

        if !(1..=2).contains(&self.channels) {
            return Err(invalid("audio.channels", self.channels).into());
        }

        Ok(())
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Caption segmentation and overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Draw captions at all; when off no font is needed
    pub enabled: bool,

    /// Clauses longer than this are split into word-packed chunks
    pub max_chars_per_line: usize,

    /// Maximum rendered line width before wrapping
    pub box_max_width_px: u32,

    /// Vertical distance between wrapped lines
    pub line_height_px: u32,

    /// Font size of caption text
    pub font_size_px: f32,

    /// Inner padding of the background box
    pub box_padding_px: u32,

    /// Gap between the bottom of the box and the bottom of the frame
    pub bottom_margin_px: u32,

    /// Background box opacity (0.0-1.0)
    pub box_opacity: f32,

    /// TrueType/OpenType font used for caption glyphs
    pub font_path: Option<PathBuf>,

    /// System font family tried first when no font_path is given
    pub font_family: Option<String>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_chars_per_line: DEFAULT_MAX_CHARS_PER_LINE,
            box_max_width_px: 1400,
            line_height_px: 80,
            font_size_px: 60.0,
            box_padding_px: 40,
            bottom_margin_px: 100,
            box_opacity: 0.7,
            font_path: None,
            font_family: None,
        }
    }
}

impl CaptionConfig {
    fn validate(&self) -> Result<()> {
        if self.max_chars_per_line == 0 {
            return Err(invalid("caption.max_chars_per_line", self.max_chars_per_line).into());
        }

        if self.font_size_px <= 0.0 || self.line_height_px == 0 {
            return Err(invalid(
                "caption.font_size_px",
                format!("{} (line height {})", self.font_size_px, self.line_height_px),
            )
            .into());
        }

        if !(0.0..=1.0).contains(&self.box_opacity) {
            return Err(invalid("caption.box_opacity", self.box_opacity).into());
        }

        Ok(())
    }
}

/// Export behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// FFmpeg executable
    pub ffmpeg_path: PathBuf,

    /// Give up on a scene whose assets are not ready after this many seconds.
    /// `None` waits forever.
    pub asset_timeout_secs: Option<f64>,

    /// Replace an existing output file
    pub overwrite: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            asset_timeout_secs: None,
            overwrite: true,
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.asset_timeout_secs {
            if !timeout.is_finite() || timeout <= 0.0 {
                return Err(invalid("export.asset_timeout_secs", timeout).into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original_config = Config::default();
        original_config.video.fps = 30;
        original_config.caption.font_path = Some(PathBuf::from("/fonts/Pretendard-Bold.otf"));

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(loaded_config.video.fps, 30);
        assert_eq!(loaded_config.caption.max_chars_per_line, 25);
        assert_eq!(loaded_config.caption.font_path, original_config.caption.font_path);
        assert_eq!(loaded_config.motion.pan_scale, original_config.motion.pan_scale);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[video]\nwidth = 640\nheight = 360\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.video.width, 640);
        assert_eq!(config.video.fps, 60);
        assert_eq!(config.caption.line_height_px, 80);
        assert!(config.caption.enabled);
    }

    #[test]
    fn test_odd_resolution_rejected() {
        let mut config = Config::default();
        config.video.width = 641;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_caption_config() {
        let mut config = Config::default();
        config.caption.box_opacity = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.caption.max_chars_per_line = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_timeout_rejected() {
        let mut config = Config::default();
        config.export.asset_timeout_secs = Some(0.0);
        assert!(config.validate().is_err());
    }
}
