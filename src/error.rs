use thiserror::Error;

/// Main error type for the Scene Compositor library
#[derive(Error, Debug)]
pub enum CompositorError {
    /// A scene failed; the whole export is aborted and nothing is written.
    /// `index` is 0-based, messages number scenes from 1.
    #[error("Scene {} failed: {source}", .index + 1)]
    Scene {
        index: usize,
        #[source]
        source: SceneError,
    },

    #[error("Encoding error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Why a single scene aborted the export
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("asset load failed: {0}")]
    AssetLoad(#[from] AssetError),

    #[error("assets were not ready after {waited_secs:.1}s")]
    SyncTimeout { waited_secs: f64 },

    #[error("encoder failed: {0}")]
    Encoder(#[from] EncoderError),

    #[error("export cancelled")]
    Cancelled,
}

/// Image or audio asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to load image: {path}")]
    ImageLoad { path: String },

    #[error("Failed to load audio file: {path}")]
    AudioLoad { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Decoding failed: {reason}")]
    Decode { reason: String },
}

/// Capture / mux errors
#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("FFmpeg not found. Please install FFmpeg or set export.ffmpeg_path")]
    FfmpegNotFound,

    #[error("Failed to spawn encoder process: {reason}")]
    Spawn { reason: String },

    #[error("Failed to write to encoder: {reason}")]
    Write { reason: String },

    #[error("Encoding failed: {reason}")]
    Failed { reason: String },

    #[error("Frame size mismatch: got {got:?}, expected {expected:?}")]
    FrameSize { got: (u32, u32), expected: (u32, u32) },

    #[error("Encoder used before start() or after finalize()")]
    NotStarted,
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("No caption font found; set caption.font_path or caption.font_family, or disable captions")]
    MissingFont,
}

/// Scene manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest not found: {path}")]
    NotFound { path: String },

    #[error("Failed to parse manifest {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("No scenes found in: {path}")]
    NoScenes { path: String },

    #[error("Scene {position} is missing its {asset}")]
    MissingAsset { position: u32, asset: &'static str },

    #[error("Duplicate scene position: {position}")]
    DuplicatePosition { position: u32 },
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Attribute a scene-level failure to the scene at `index`
    pub fn scene(index: usize, source: impl Into<SceneError>) -> Self {
        Self::Scene {
            index,
            source: source.into(),
        }
    }

    /// Index of the scene that caused the failure, if any
    pub fn scene_index(&self) -> Option<usize> {
        match self {
            Self::Scene { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Scene {
                source: SceneError::Cancelled,
                ..
            }
        )
    }

    /// Check if this error is recoverable (can be retried)
    ///
    /// The compositor never retries by itself; this only tells callers whether
    /// regenerating an asset and re-invoking the export is worth trying.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Scene { source, .. } => matches!(
                source,
                SceneError::AssetLoad(_) | SceneError::SyncTimeout { .. }
            ),
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Scene { index, source } => match source {
                SceneError::AssetLoad(AssetError::ImageLoad { path }) => format!(
                    "Scene {} failed: could not load image '{}'. Please check the file exists and is a supported format.",
                    index + 1,
                    path
                ),
                SceneError::AssetLoad(AssetError::AudioLoad { path }) => format!(
                    "Scene {} failed: could not load audio '{}'. Please check the file exists and is a supported format.",
                    index + 1,
                    path
                ),
                SceneError::Cancelled => format!("Export cancelled during scene {}.", index + 1),
                other => format!("Scene {} failed: {}", index + 1, other),
            },
            Self::Encoder(EncoderError::FfmpegNotFound) => {
                "FFmpeg was not found. Install FFmpeg or point export.ffmpeg_path at it.".to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
