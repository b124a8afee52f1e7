use std::path::PathBuf;

/// Lifecycle of a single scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScenePhase {
    #[default]
    Idle,
    /// Image and audio are being decoded
    Loading,
    /// Frames are rendered from the audio clock
    Playing,
    /// Motion finished; waiting for the audio source to end
    Complete,
}

/// Lifecycle of a whole export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Complete,
    Failed,
}

/// Stages of the export process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Rendering,
    Finalizing,
    Complete,
}

/// Progress callback for exports
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send + Sync>;

/// Export progress report, sent after every completed scene
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Fraction of scenes completed [0.0, 1.0]
    pub progress: f64,

    pub scenes_completed: usize,

    pub total_scenes: usize,

    pub frames_rendered: u64,

    pub stage: ExportStage,
}

impl ExportProgress {
    /// Progress as a whole percentage
    pub fn percent(&self) -> u32 {
        (self.progress * 100.0).round() as u32
    }
}

/// What happened to one scene during an export
#[derive(Debug, Clone, PartialEq)]
pub struct SceneReport {
    pub index: usize,
    pub position: u32,
    pub audio_duration: f64,
    pub frames: u64,
    pub captions: usize,
}

/// Summary of a finished export
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// `None` when nothing was written (dry run)
    pub output: Option<PathBuf>,
    pub duration: f64,
    pub frame_count: u64,
    pub file_size: u64,
    pub scenes: Vec<SceneReport>,
}
