use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

use super::{
    easing::ease_in_out_cubic,
    effect::{Direction, EffectSpec, EffectType, Speed},
    DEFAULT_ZOOM_AMOUNT, PAN_DISTANCE_RATIO, PAN_SCALE, PARALLAX_PAN_FACTOR,
    PARALLAX_SCALE_BOOST, PARALLAX_VERTICAL_RATIO, SUBTLE_ZOOM_AMOUNT,
};

/// Scale and offset applied to the scene image for one frame.
///
/// Offsets are in output-frame pixels and shift the image relative to the
/// centered position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformResult {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl TransformResult {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    fn zoom(scale: f64) -> Self {
        Self {
            scale,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// Tunable motion constants; defaults are the documented module constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub default_zoom_amount: f64,
    pub subtle_zoom_amount: f64,
    pub pan_distance_ratio: f64,
    pub pan_scale: f64,
    pub parallax_scale_boost: f64,
    pub parallax_pan_factor: f64,
    pub parallax_vertical_ratio: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            default_zoom_amount: DEFAULT_ZOOM_AMOUNT,
            subtle_zoom_amount: SUBTLE_ZOOM_AMOUNT,
            pan_distance_ratio: PAN_DISTANCE_RATIO,
            pan_scale: PAN_SCALE,
            parallax_scale_boost: PARALLAX_SCALE_BOOST,
            parallax_pan_factor: PARALLAX_PAN_FACTOR,
            parallax_vertical_ratio: PARALLAX_VERTICAL_RATIO,
        }
    }
}

impl MotionConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        let non_negative = [
            ("motion.default_zoom_amount", self.default_zoom_amount),
            ("motion.subtle_zoom_amount", self.subtle_zoom_amount),
            ("motion.pan_distance_ratio", self.pan_distance_ratio),
            ("motion.parallax_scale_boost", self.parallax_scale_boost),
            ("motion.parallax_pan_factor", self.parallax_pan_factor),
            ("motion.parallax_vertical_ratio", self.parallax_vertical_ratio),
        ];
        for (key, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }.into());
            }
        }

        if !(self.pan_scale >= 1.0) {
            return Err(ConfigError::InvalidValue {
                key: "motion.pan_scale".to_string(),
                value: self.pan_scale.to_string(),
            }.into());
        }

        Ok(())
    }
}

/// Computes per-frame transforms for a fixed output frame size
#[derive(Debug, Clone)]
pub struct MotionEngine {
    config: MotionConfig,
    width: f64,
    height: f64,
}

impl MotionEngine {
    pub fn new(config: MotionConfig, width: u32, height: u32) -> Self {
        Self {
            config,
            width: width as f64,
            height: height as f64,
        }
    }

    /// Transform for `effect` at scene `progress` (clamped to `[0, 1]`).
    ///
    /// `None` means no effect spec: a gentle zoom-in.
    pub fn transform(&self, effect: Option<&EffectSpec>, progress: f64) -> TransformResult {
        let eased = ease_in_out_cubic(progress);
        let cfg = &self.config;

        let Some(effect) = effect else {
            return TransformResult::zoom(1.0 + eased * cfg.default_zoom_amount);
        };

        // Speed is applied to the eased value, so "fast" finishes the motion
        // at the halfway point and holds there.
        let e = match effect.effective_speed() {
            Speed::Fast => (eased * 2.0).min(1.0),
            Speed::Slow | Speed::Medium => eased,
        };

        let target_scale = self.target_scale(effect);
        let max_pan = self.width * cfg.pan_distance_ratio;

        match effect.effect_type {
            EffectType::Parallax3d => TransformResult {
                scale: 1.0 + e * (target_scale - 1.0) * cfg.parallax_scale_boost,
                offset_x: effect.direction.sign() * e * max_pan * cfg.parallax_pan_factor,
                offset_y: e * self.height * cfg.parallax_vertical_ratio,
            },
            EffectType::ZoomInSlow | EffectType::ZoomInFast => {
                TransformResult::zoom(1.0 + e * (target_scale - 1.0))
            }
            EffectType::ZoomOutSlow => TransformResult::zoom(target_scale - e * (target_scale - 1.0)),
            EffectType::PanLeft => TransformResult {
                scale: cfg.pan_scale,
                offset_x: Direction::Left.sign() * e * max_pan,
                offset_y: 0.0,
            },
            EffectType::PanRight => TransformResult {
                scale: cfg.pan_scale,
                offset_x: Direction::Right.sign() * e * max_pan,
                offset_y: 0.0,
            },
            EffectType::StaticSubtle => TransformResult::zoom(1.0 + e * cfg.subtle_zoom_amount),
            EffectType::None | EffectType::Unknown => {
                TransformResult::zoom(1.0 + e * cfg.default_zoom_amount)
            }
        }
    }

    /// Target scale clamped so the image can never shrink below the frame
    fn target_scale(&self, effect: &EffectSpec) -> f64 {
        let requested = effect.target_scale;
        if requested.is_finite() && requested >= 1.0 {
            requested
        } else {
            1.0
        }
    }
}

/// Transform with the default motion constants
pub fn transform(effect: Option<&EffectSpec>, progress: f64, width: u32, height: u32) -> TransformResult {
    MotionEngine::new(MotionConfig::default(), width, height).transform(effect, progress)
}
