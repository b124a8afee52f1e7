//! # Frame Rendering
//!
//! Turns a scene image, a motion transform and an optional caption chunk into
//! one output frame.
//!
//! ```rust,no_run
//! use scene_compositor::config::Config;
//! use scene_compositor::motion::TransformResult;
//! use scene_compositor::render::{FrameRenderer, SourceImage};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let renderer = FrameRenderer::new(&Config::default())?;
//! let source = SourceImage::load("01_intro.png")?;
//! let mut frame = renderer.new_frame();
//!
//! renderer.render(&mut frame, &source, TransformResult::identity(), Some("안녕하세요,"));
//! frame.save_png("preview.png")?;
//! # Ok(())
//! # }
//! ```

pub mod caption;
pub mod frame;
pub mod renderer;
pub mod text;

pub use caption::{CaptionLayout, CaptionRenderer};
pub use frame::{Frame, SourceImage};
pub use renderer::FrameRenderer;
pub use text::{ApproxMetrics, GlyphFont, TextMetrics};
