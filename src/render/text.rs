use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use tracing::debug;

use crate::error::ConfigError;

/// Installed families tried in order when no caption font is configured.
/// Hangul/CJK faces come first so mixed-script captions render.
const SYSTEM_FAMILIES: &[&str] = &[
    "Noto Sans CJK KR",
    "Noto Sans KR",
    "Apple SD Gothic Neo",
    "Malgun Gothic",
    "NanumGothic",
    "Noto Sans",
    "DejaVu Sans",
    "Liberation Sans",
    "Arial",
    "Helvetica",
];

/// Measures and draws caption text
pub trait TextMetrics: Send + Sync {
    /// Horizontal advance of `text` in pixels at `size_px`
    fn width(&self, text: &str, size_px: f32) -> f32;

    /// Draw `text` with its left edge at `x`, vertically centred on `center_y`
    fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, center_y: i32, size_px: f32, color: Rgb<u8>);

    /// Whether [`TextMetrics::draw`] actually renders glyphs
    fn renders_glyphs(&self) -> bool {
        true
    }
}

/// Glyph metrics and rasterization from a TrueType/OpenType font
pub struct GlyphFont {
    font: Font<'static>,
}

impl GlyphFont {
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        Font::try_from_vec(bytes).map(|font| Self { font })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let invalid = || ConfigError::InvalidValue {
            key: "caption.font_path".to_string(),
            value: path.display().to_string(),
        };

        let bytes = std::fs::read(path).map_err(|_| invalid())?;
        Self::from_bytes(bytes).ok_or_else(invalid)
    }

    /// Pick a font from the installed system fonts, trying `family` first.
    /// Returns `None` when nothing usable is installed.
    pub fn discover(family: Option<&str>) -> Option<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let mut families: Vec<fontdb::Family<'_>> = family.into_iter().map(fontdb::Family::Name).collect();
        families.extend(SYSTEM_FAMILIES.iter().map(|name| fontdb::Family::Name(*name)));
        families.push(fontdb::Family::SansSerif);

        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight::BOLD,
            ..fontdb::Query::default()
        };
        let id = db
            .query(&query)
            .or_else(|| db.faces().find(|face| !face.monospaced).map(|face| face.id))?;

        let font = db.with_face_data(id, |data, index| Font::try_from_vec_and_index(data.to_vec(), index))??;
        if let Some((name, _)) = db.face(id).and_then(|face| face.families.first()) {
            debug!("Caption font: {}", name);
        }

        Some(Self { font })
    }
}

impl TextMetrics for GlyphFont {
    fn width(&self, text: &str, size_px: f32) -> f32 {
        text_size(Scale::uniform(size_px), &self.font, text).0 as f32
    }

    fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, center_y: i32, size_px: f32, color: Rgb<u8>) {
        let scale = Scale::uniform(size_px);
        let v_metrics = self.font.v_metrics(scale);
        let text_height = v_metrics.ascent - v_metrics.descent;
        let top = center_y - (text_height / 2.0).round() as i32;

        draw_text_mut(canvas, color, x, top, scale, &self.font, text);
    }
}

/// Metrics for when no font is available.
///
/// Widths come from a coarse per-character advance table so line wrapping and
/// box geometry stay stable, but no glyphs are drawn. The player refuses to
/// export non-blank captions through it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApproxMetrics;

impl ApproxMetrics {
    fn advance(c: char) -> f32 {
        match c {
            ' ' => 0.3,
            'i' | 'l' | 'j' | '.' | ',' | '!' | '\'' | '|' => 0.3,
            'm' | 'w' | 'M' | 'W' => 0.85,
            c if c.is_ascii_uppercase() || c.is_ascii_digit() => 0.65,
            c if c.is_ascii() => 0.55,
            // CJK, Hangul and other full-width scripts
            _ => 1.0,
        }
    }
}

impl TextMetrics for ApproxMetrics {
    fn width(&self, text: &str, size_px: f32) -> f32 {
        text.chars().map(Self::advance).sum::<f32>() * size_px
    }

    fn draw(&self, _canvas: &mut RgbImage, _text: &str, _x: i32, _center_y: i32, _size_px: f32, _color: Rgb<u8>) {}

    fn renders_glyphs(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_approx_width_scales_with_size() {
        let metrics = ApproxMetrics;
        let small = metrics.width("hello world", 10.0);
        let large = metrics.width("hello world", 20.0);

        assert!(small > 0.0);
        assert!((large - small * 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_approx_wide_scripts_are_wider() {
        let metrics = ApproxMetrics;
        assert!(metrics.width("안녕하세요", 60.0) > metrics.width("hello", 60.0));
        assert!(!metrics.renders_glyphs());
    }

    #[test]
    fn test_invalid_font_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();

        assert!(matches!(
            GlyphFont::load(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(GlyphFont::load(dir.path().join("missing.ttf")).is_err());
    }

    #[test]
    fn test_system_font_draws_glyphs() {
        let Some(font) = GlyphFont::discover(None) else {
            eprintln!("no system fonts installed, skipping");
            return;
        };

        assert!(font.renders_glyphs());
        assert!(font.width("Hello world", 60.0) > font.width("Hello", 60.0));

        let mut canvas = RgbImage::new(400, 100);
        font.draw(&mut canvas, "Hello", 10, 50, 60.0, Rgb([255, 255, 255]));
        assert!(canvas.pixels().any(|p| p[0] > 200));
    }
}
