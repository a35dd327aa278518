//! Easing curves and timing presets.

use serde::{Deserialize, Serialize};

/// Easing curve mapping linear progress in `[0, 1]` to eased progress.
///
/// `ElasticOut` and `BackOut` overshoot past 1 before settling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    Linear,
    QuadOut,
    CubicIn,
    CubicOut,
    #[default]
    CubicInOut,
    BackOut,
    ElasticOut,
    BounceOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::BackOut => {
                const S: f32 = 1.701_58;
                let u = t - 1.0;
                1.0 + (S + 1.0) * u * u * u + S * u * u
            }
            Easing::ElasticOut => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let c4 = std::f32::consts::TAU / 3.0;
                2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
            }
            Easing::BounceOut => bounce_out(t),
        }
    }

    /// Whether the curve leaves `[0, 1]` on its way to 1.
    pub fn overshoots(self) -> bool {
        matches!(self, Easing::BackOut | Easing::ElasticOut)
    }
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.937_5
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984_375
    }
}

/// Named timing presets. They differ only in duration and curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPreset {
    Fast,
    #[default]
    Normal,
    Slow,
    Elastic,
    Bounce,
}

/// Timing of one animation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub duration_ms: f64,
    pub easing: Easing,
    pub delay_ms: f64,
}

impl AnimationConfig {
    pub const fn new(duration_ms: f64, easing: Easing) -> Self {
        Self {
            duration_ms,
            easing,
            delay_ms: 0.0,
        }
    }

    pub fn preset(preset: AnimationPreset) -> Self {
        match preset {
            AnimationPreset::Fast => Self::new(200.0, Easing::CubicOut),
            AnimationPreset::Normal => Self::new(400.0, Easing::CubicInOut),
            AnimationPreset::Slow => Self::new(800.0, Easing::CubicInOut),
            AnimationPreset::Elastic => Self::new(1000.0, Easing::ElasticOut),
            AnimationPreset::Bounce => Self::new(800.0, Easing::BounceOut),
        }
    }

    /// Finish instantly on the next frame.
    pub const fn immediate() -> Self {
        Self::new(0.0, Easing::Linear)
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self::preset(AnimationPreset::Normal)
    }
}

impl From<AnimationPreset> for AnimationConfig {
    fn from(preset: AnimationPreset) -> Self {
        Self::preset(preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 8] = [
        Easing::Linear,
        Easing::QuadOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::CubicInOut,
        Easing::BackOut,
        Easing::ElasticOut,
        Easing::BounceOut,
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-5, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-5, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_input_is_clamped() {
        assert_eq!(Easing::Linear.apply(-1.0), 0.0);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
    }

    #[test]
    fn test_cubic_in_out_midpoint() {
        assert!((Easing::CubicInOut.apply(0.5) - 0.5).abs() < 1e-6);
        assert!(Easing::CubicIn.apply(0.5) < 0.5);
        assert!(Easing::CubicOut.apply(0.5) > 0.5);
    }

    #[test]
    fn test_elastic_overshoots() {
        let peak = (1..100)
            .map(|i| Easing::ElasticOut.apply(i as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_presets() {
        assert_eq!(AnimationConfig::preset(AnimationPreset::Fast).duration_ms, 200.0);
        assert_eq!(AnimationConfig::default().easing, Easing::CubicInOut);
        assert_eq!(
            AnimationConfig::from(AnimationPreset::Bounce).easing,
            Easing::BounceOut
        );
        assert_eq!(AnimationConfig::immediate().with_delay(50.0).delay_ms, 50.0);
    }

    #[test]
    fn test_config_from_json() {
        let config: AnimationConfig =
            serde_json::from_str(r#"{"duration_ms": 250, "easing": "bounceOut"}"#).unwrap();
        assert_eq!(config.duration_ms, 250.0);
        assert_eq!(config.easing, Easing::BounceOut);
        assert_eq!(config.delay_ms, 0.0);
    }
}
