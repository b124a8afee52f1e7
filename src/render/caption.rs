use image::Rgb;
use tracing::warn;

use crate::config::CaptionConfig;
use crate::error::ConfigError;
use crate::render::frame::Frame;
use crate::render::text::{ApproxMetrics, GlyphFont, TextMetrics};

/// Extra width of the caption box beyond the wrap width
const BOX_EXTRA_WIDTH: u32 = 100;

/// Minimum gap kept between the caption box and the frame's side edges
const BOX_SIDE_MARGIN: u32 = 100;

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Where a caption's box and lines land on the frame
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLayout {
    pub box_x: i64,
    pub box_y: i64,
    pub box_width: u32,
    pub box_height: u32,
    /// Each line with its left edge and vertical centre
    pub lines: Vec<(String, i32, i32)>,
}

/// Draws the active caption chunk in a box near the bottom of the frame
pub struct CaptionRenderer {
    style: CaptionConfig,
    metrics: Box<dyn TextMetrics>,
    frame_width: u32,
    frame_height: u32,
}

impl CaptionRenderer {
    pub fn new(style: CaptionConfig, metrics: Box<dyn TextMetrics>, frame_width: u32, frame_height: u32) -> Self {
        Self {
            style,
            metrics,
            frame_width,
            frame_height,
        }
    }

    /// Use the configured font, else the best installed system font.
    ///
    /// Finding no font at all is not an error here; [`CaptionRenderer::ensure_drawable`]
    /// rejects exports that would need one.
    pub fn from_config(style: &CaptionConfig, frame_width: u32, frame_height: u32) -> Result<Self, ConfigError> {
        let metrics: Box<dyn TextMetrics> = if !style.enabled {
            Box::new(ApproxMetrics)
        } else if let Some(path) = &style.font_path {
            Box::new(GlyphFont::load(path)?)
        } else if let Some(font) = GlyphFont::discover(style.font_family.as_deref()) {
            Box::new(font)
        } else {
            warn!("No caption font found on this system; set caption.font_path");
            Box::new(ApproxMetrics)
        };

        Ok(Self::new(style.clone(), metrics, frame_width, frame_height))
    }

    pub fn enabled(&self) -> bool {
        self.style.enabled
    }

    pub fn renders_glyphs(&self) -> bool {
        self.metrics.renders_glyphs()
    }

    /// Fail if any of `scripts` would produce a caption this renderer cannot
    /// draw. Blank scripts and disabled captions never need a font.
    pub fn ensure_drawable<'a>(&self, mut scripts: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
        if self.enabled() && !self.renders_glyphs() && scripts.any(|script| !script.trim().is_empty()) {
            return Err(ConfigError::MissingFont);
        }
        Ok(())
    }

    /// Greedy word wrap against the box's maximum text width
    pub fn wrap(&self, text: &str) -> Vec<String> {
        let max_width = self.style.box_max_width_px as f32;
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in text.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }

            let candidate = format!("{} {}", current, word);
            if self.metrics.width(&candidate, self.style.font_size_px) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    pub fn layout(&self, text: &str) -> CaptionLayout {
        let lines = self.wrap(text);
        let s = &self.style;

        let box_height = lines.len() as u32 * s.line_height_px + 2 * s.box_padding_px;
        let box_width = (s.box_max_width_px + BOX_EXTRA_WIDTH).min(self.frame_width.saturating_sub(BOX_SIDE_MARGIN));
        let box_x = (self.frame_width as i64 - box_width as i64) / 2;
        let box_y = self.frame_height as i64 - s.bottom_margin_px as i64 - box_height as i64;

        let center_x = self.frame_width as f32 / 2.0;
        let lines = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                let width = self.metrics.width(&line, s.font_size_px);
                let x = (center_x - width / 2.0).round() as i32;
                let center_y = box_y
                    + s.box_padding_px as i64
                    + (i as u32 * s.line_height_px) as i64
                    + (s.line_height_px / 2) as i64;
                (line, x, center_y as i32)
            })
            .collect();

        CaptionLayout {
            box_x,
            box_y,
            box_width,
            box_height,
            lines,
        }
    }

    pub fn draw(&self, frame: &mut Frame, text: &str) {
        if !self.style.enabled {
            return;
        }

        let layout = self.layout(text);
        if layout.lines.is_empty() {
            return;
        }

        self.fill_box(frame, &layout);

        let size = self.style.font_size_px;
        for (line, x, center_y) in &layout.lines {
            self.metrics
                .draw(frame.as_image_mut(), line, *x, *center_y, size, TEXT_COLOR);
        }
    }

    /// Darken the box area towards black by `box_opacity`
    fn fill_box(&self, frame: &mut Frame, layout: &CaptionLayout) {
        let x0 = layout.box_x.max(0) as u32;
        let y0 = layout.box_y.max(0) as u32;
        let x1 = ((layout.box_x + layout.box_width as i64).max(0) as u32).min(frame.width());
        let y1 = ((layout.box_y + layout.box_height as i64).max(0) as u32).min(frame.height());
        let keep = 1.0 - self.style.box_opacity.clamp(0.0, 1.0);

        let image = frame.as_image_mut();
        for y in y0..y1 {
            for x in x0..x1 {
                let pixel = image.get_pixel_mut(x, y);
                for channel in pixel.0.iter_mut() {
                    *channel = (*channel as f32 * keep).round() as u8;
                }
            }
        }
    }
}
