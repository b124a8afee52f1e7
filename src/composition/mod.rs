//! # Scene Composition
//!
//! The compositor wires the scene player to the offline playback device and
//! an encoder, turning a [`SceneList`](crate::scene::SceneList) into one video.

pub mod engine;

// Re-exports for convenience
pub use engine::SceneCompositor;
