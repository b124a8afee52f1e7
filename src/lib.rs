//! # Scene Compositor
//!
//! Turn a sequence of narrated stills into one video, timed exactly by the
//! narration audio.
//!
//! Each scene is an image, an audio clip, a script and an optional camera
//! motion. The image is shown with an eased pan/zoom for as long as its audio
//! plays, with the script split into short captions that advance with the
//! audio.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_compositor::{
//!     composition::SceneCompositor,
//!     config::Config,
//!     player::cancel_pair,
//!     scene::load_scenes,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let scenes = load_scenes("story.toml")?;
//! let (_handle, cancel) = cancel_pair();
//!
//! let compositor = SceneCompositor::new(Config::default())
//!     .with_progress(|p| println!("{}%", p.percent()));
//!
//! let report = compositor.export(&scenes, "story.mp4", cancel).await?;
//! println!("Wrote {:.1}s of video", report.duration);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`subtitle`] - Script segmentation into caption chunks
//! - [`motion`] - Camera motion transforms and easing
//! - [`render`] - Frame rendering with caption overlays
//! - [`audio`] - Narration decoding and the playback device clock
//! - [`player`] - Scene-by-scene playback driven by the audio clock
//! - [`encoder`] - Frame and audio capture into the output file
//! - [`scene`] - Scene lists, manifests and directory discovery
//! - [`composition`] - The export facade tying it all together
//! - [`config`] - Configuration management

pub mod audio;
pub mod composition;
pub mod config;
pub mod encoder;
pub mod error;
pub mod motion;
pub mod player;
pub mod render;
pub mod scene;
pub mod subtitle;

// Re-export commonly used types for convenience
pub use crate::{
    composition::SceneCompositor,
    config::Config,
    error::{CompositorError, Result},
    scene::{Scene, SceneList},
};
