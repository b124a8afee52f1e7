//! # Audio Module
//!
//! Decodes narration clips and models the playback device whose clock drives
//! the whole export.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scene_compositor::audio::{AudioFormat, AudioLoader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let clip = AudioLoader::load("01_intro.wav")?
//!     .conform(AudioFormat { sample_rate: 48_000, channels: 2 });
//!
//! println!("Narration lasts {:.2}s", clip.duration());
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod loader;
pub mod types;

pub use device::{OfflineDevice, PlaybackDevice};
pub use loader::AudioLoader;
pub use types::{AudioClip, AudioFormat};
