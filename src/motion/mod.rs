//! # Motion Transform Engine
//!
//! Maps a scene's camera-motion spec and its playback progress to the
//! scale/offset applied to the scene image for one frame.
//!
//! ```rust
//! use scene_compositor::motion::{transform, EffectSpec, EffectType};
//!
//! let pan = EffectSpec::new(EffectType::PanRight);
//! let end = transform(Some(&pan), 1.0, 1920, 1080);
//! assert_eq!(end.scale, 1.05);
//! assert!((end.offset_x + 192.0).abs() < 1e-9);
//! ```

pub mod easing;
pub mod effect;
pub mod transform;

pub use easing::ease_in_out_cubic;
pub use effect::{Direction, EffectSpec, EffectType, Speed};
pub use transform::{transform, MotionConfig, MotionEngine, TransformResult};

/// Target scale used when an effect spec does not name one
pub const DEFAULT_TARGET_SCALE: f64 = 1.2;

/// Zoom amount of the default gentle zoom-in (no effect spec)
pub const DEFAULT_ZOOM_AMOUNT: f64 = 0.15;

/// Zoom amount of `static_subtle`
pub const SUBTLE_ZOOM_AMOUNT: f64 = 0.05;

/// Maximum horizontal pan as a fraction of the frame width
pub const PAN_DISTANCE_RATIO: f64 = 0.1;

/// Fixed scale held during pans
pub const PAN_SCALE: f64 = 1.05;

/// Parallax zooms this much further than a plain zoom to the same target
pub const PARALLAX_SCALE_BOOST: f64 = 1.2;

/// Parallax pans this fraction of the full pan distance
pub const PARALLAX_PAN_FACTOR: f64 = 0.5;

/// Parallax vertical drift as a fraction of the frame height
pub const PARALLAX_VERTICAL_RATIO: f64 = 0.02;
