//! Visual modulation driven by an external coherence signal.
//!
//! Coherence is a scalar in [-1, 1] (high stress to deep calm). It maps to a
//! set of optional parameters: layers consume `layer_separation`, particles
//! consume the rest. An absent field means "leave as is / use the default".

use cloudfield_core::color::Srgb;
use serde::{Deserialize, Serialize};

/// Per-frame modulation handed to layers and particles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationParams {
    /// Multiplier on each particle's base opacity.
    pub opacity: Option<f64>,
    /// Multiplier on sprite radius at render time.
    pub glow_radius: Option<f64>,
    /// Target tint; particles move 30% of the way toward it.
    pub color_temp: Option<Srgb>,
    /// Multiplier on drift velocity.
    pub movement_speed: Option<f64>,
    /// Layer spread factor (1.0 normal, above expands, below compresses).
    pub layer_separation: Option<f64>,
}

impl ModulationParams {
    /// Every field present at its neutral value.
    pub fn neutral(base_color: Srgb) -> Self {
        Self {
            opacity: Some(1.0),
            glow_radius: Some(1.0),
            color_temp: Some(base_color),
            movement_speed: Some(1.0),
            layer_separation: Some(1.0),
        }
    }

    /// Maps a coherence level onto visual parameters.
    ///
    /// Non-finite input is treated as neutral (0.0); everything else is
    /// clamped to [-1, 1].
    pub fn from_coherence(coherence: f64, base_color: Srgb) -> Self {
        let c = if coherence.is_finite() {
            coherence.clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let opacity = if c < 0.0 {
            0.6 + (c + 1.0) * 0.2
        } else {
            0.8 + c * 0.2
        };
        let glow_radius = if c < 0.0 {
            0.8 + (c + 1.0) * 0.2
        } else {
            1.0 + c * 0.3
        };
        // Calm and stress both slow the drift; neutral moves fastest.
        let movement_speed = 1.0 - c.abs() * 0.3;
        let layer_separation = 0.7 + c * 0.5;

        Self {
            opacity: Some(opacity),
            glow_radius: Some(glow_radius),
            color_temp: Some(color_temperature(c, base_color)),
            movement_speed: Some(movement_speed),
            layer_separation: Some(layer_separation),
        }
    }
}

fn color_temperature(c: f64, base_color: Srgb) -> Srgb {
    if c < -0.5 {
        Srgb::from_rgb8(180, 195, 210)
    } else if c < 0.0 {
        Srgb::from_rgb8(200, 210, 220)
    } else if c > 0.7 {
        Srgb::from_rgb8(255, 245, 220)
    } else if c > 0.3 {
        Srgb::from_rgb8(245, 240, 230)
    } else {
        base_color
    }
}
