//! # Scenes
//!
//! The typed scene list an export plays through, loaded from a TOML/JSON
//! manifest or discovered from a directory of `NN_name.*` assets.

pub mod manifest;
pub mod types;

pub use manifest::{discover_scenes, load_manifest, load_scenes};
pub use types::{Scene, SceneList};
