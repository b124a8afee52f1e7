//! # Scene Player
//!
//! Drives the export one scene at a time: `Idle → Loading → Playing →
//! Complete` per scene, with all timing derived from the playback device's
//! audio clock. Scene N+1 is never loaded while scene N's audio plays.

pub mod assets;
pub mod cancel;
#[allow(clippy::module_inception)]
pub mod player;
pub mod state;

pub use assets::{AssetLoader, FsAssetLoader};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use player::ScenePlayer;
pub use state::{
    ExportProgress, ExportReport, ExportStage, ProgressCallback, RunState, ScenePhase, SceneReport,
};
