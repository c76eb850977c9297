//! A single soft cloud particle and its per-frame drift.

use cloudfield_core::canvas::CanvasSize;
use cloudfield_core::color::Srgb;
use cloudfield_core::render::SpriteDraw;
use glam::DVec2;
use serde::Serialize;

use crate::config::DriftMode;
use crate::modulation::ModulationParams;
use crate::noise_field::NoiseField;

/// Fraction of the way a particle's color moves toward the modulation tint.
pub const COLOR_TEMP_BLEND: f64 = 0.3;

/// Wrap margin, in multiples of the particle's scale.
const WRAP_BUFFER_SCALES: f64 = 2.0;

/// One cloud particle.
///
/// `seed` is the fixed point in the noise field the particle reads its drift
/// from (its spawn position), so each particle follows a smooth personal path
/// while `position` wanders. `depth` is copied from the owning layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudParticle {
    pub position: DVec2,
    pub seed: DVec2,
    pub base_scale: f64,
    pub scale: f64,
    pub base_opacity: f64,
    pub opacity: f64,
    pub base_color: Srgb,
    pub color: Srgb,
    /// Maximum drift speed, canvas units per frame.
    pub max_speed: f64,
    pub glow_radius: f64,
    pub depth: f64,
    /// Shape density the particle was spawned from.
    pub density: f64,
    /// Seed of the shape the particle belongs to.
    pub shape_seed: f64,
    pub drift: DriftMode,
}

impl CloudParticle {
    /// A particle at `position` with unmodulated visuals, mid depth and
    /// axis drift. Callers fill in layer-specific fields afterwards.
    pub fn new(position: DVec2, scale: f64, opacity: f64, color: Srgb, max_speed: f64) -> Self {
        Self {
            position,
            seed: position,
            base_scale: scale,
            scale,
            base_opacity: opacity,
            opacity,
            base_color: color,
            color,
            max_speed,
            glow_radius: 1.0,
            depth: 0.5,
            density: 0.0,
            shape_seed: 0.0,
            drift: DriftMode::Axis,
        }
    }

    /// Velocity for this frame, before speed modulation.
    pub fn velocity(&self, noise: &NoiseField, time: f64) -> DVec2 {
        match self.drift {
            DriftMode::Axis => noise.drift_velocity(self.seed.x, self.seed.y, self.max_speed, time),
            DriftMode::Polar { angle_offset } => noise.drift_velocity_polar(
                self.seed.x,
                self.seed.y,
                self.max_speed,
                time,
                angle_offset,
            ),
        }
    }

    /// Advances one frame: drift, wrap at the canvas edges, then apply
    /// visual modulation. Absent modulation fields fall back to neutral.
    pub fn update(
        &mut self,
        noise: &NoiseField,
        time: f64,
        modulation: &ModulationParams,
        canvas: CanvasSize,
    ) {
        let speed = modulation.movement_speed.unwrap_or(1.0);
        self.position += self.velocity(noise, time) * speed;
        self.wrap(canvas);

        self.opacity = (self.base_opacity * modulation.opacity.unwrap_or(1.0)).clamp(0.0, 1.0);
        self.glow_radius = modulation.glow_radius.unwrap_or(1.0);
        if let Some(tint) = modulation.color_temp {
            self.color = self.base_color.lerp(tint, COLOR_TEMP_BLEND);
        }
    }

    /// Keeps the particle within `[-buffer, extent + buffer]` on both axes,
    /// re-entering on the opposite side so sprites never pop at the edges.
    fn wrap(&mut self, canvas: CanvasSize) {
        let buffer = self.scale * WRAP_BUFFER_SCALES;
        let wrap_axis = |p: f64, extent: f64| {
            if p < -buffer || p > extent + buffer {
                (p + buffer).rem_euclid(extent + 2.0 * buffer) - buffer
            } else {
                p
            }
        };
        self.position.x = wrap_axis(self.position.x, canvas.width());
        self.position.y = wrap_axis(self.position.y, canvas.height());
    }

    /// Draw radius including glow.
    pub fn radius(&self) -> f64 {
        self.scale * self.glow_radius
    }

    /// Fully transparent or zero-sized particles draw nothing.
    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0 && self.radius() > 0.0
    }

    pub fn sprite(&self) -> SpriteDraw {
        SpriteDraw {
            position: self.position,
            radius: self.radius(),
            opacity: self.opacity,
            color: self.color,
        }
    }
}
