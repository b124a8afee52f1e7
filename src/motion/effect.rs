use serde::{Deserialize, Serialize};

use super::DEFAULT_TARGET_SCALE;

/// Camera motion applied to a scene image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    /// Default gentle zoom-in
    #[default]
    None,

    /// Zoom combined with a directional drift for a depth effect
    #[serde(rename = "3d_parallax")]
    Parallax3d,

    ZoomInSlow,

    ZoomInFast,

    /// Starts zoomed in and settles on the full image
    ZoomOutSlow,

    PanLeft,

    PanRight,

    /// Barely perceptible zoom
    StaticSubtle,

    /// Any type this version does not know; rendered like `None`
    #[serde(other)]
    Unknown,
}

impl EffectType {
    /// Speed implied by the type name when the spec leaves it out
    pub fn implied_speed(self) -> Speed {
        match self {
            Self::ZoomInFast => Speed::Fast,
            Self::ZoomInSlow | Self::ZoomOutSlow => Speed::Slow,
            _ => Speed::Medium,
        }
    }
}

/// Horizontal direction of pans and parallax drift
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Center,
    Left,
    Right,
}

impl Direction {
    /// Sign applied to horizontal offsets: the image moves right when the
    /// camera pans left.
    pub fn sign(self) -> f64 {
        match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
            Self::Center => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    Slow,
    #[default]
    Medium,
    /// Reaches the end of the motion halfway through the scene, then holds
    Fast,
}

/// Per-scene camera-motion configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEffectSpec")]
pub struct EffectSpec {
    pub effect_type: EffectType,

    /// Scale reached at the end of zooms (start of zoom-outs)
    pub target_scale: f64,

    pub direction: Direction,

    /// Explicit speed; falls back to [`EffectType::implied_speed`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<Speed>,
}

impl EffectSpec {
    pub fn new(effect_type: EffectType) -> Self {
        Self {
            effect_type,
            target_scale: DEFAULT_TARGET_SCALE,
            direction: Direction::Center,
            speed: None,
        }
    }

    pub fn with_target_scale(mut self, target_scale: f64) -> Self {
        self.target_scale = target_scale;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn effective_speed(&self) -> Speed {
        self.speed.unwrap_or_else(|| self.effect_type.implied_speed())
    }
}

/// Accepts both the flat layout and the nested `motion_params` layout
/// (`{ effect_type, motion_params: { scale, direction, speed } }`).
#[derive(Deserialize)]
struct RawEffectSpec {
    #[serde(default, alias = "type")]
    effect_type: EffectType,
    #[serde(default, alias = "scale")]
    target_scale: Option<f64>,
    #[serde(default)]
    direction: Option<Direction>,
    #[serde(default)]
    speed: Option<Speed>,
    #[serde(default)]
    motion_params: Option<RawMotionParams>,
}

#[derive(Deserialize)]
struct RawMotionParams {
    #[serde(default, alias = "target_scale")]
    scale: Option<f64>,
    #[serde(default)]
    direction: Option<Direction>,
    #[serde(default)]
    speed: Option<Speed>,
}

impl From<RawEffectSpec> for EffectSpec {
    fn from(raw: RawEffectSpec) -> Self {
        let params = raw.motion_params;

        Self {
            effect_type: raw.effect_type,
            target_scale: raw
                .target_scale
                .or_else(|| params.as_ref().and_then(|p| p.scale))
                .unwrap_or(DEFAULT_TARGET_SCALE),
            direction: raw
                .direction
                .or_else(|| params.as_ref().and_then(|p| p.direction))
                .unwrap_or_default(),
            speed: raw.speed.or_else(|| params.as_ref().and_then(|p| p.speed)),
        }
    }
}
