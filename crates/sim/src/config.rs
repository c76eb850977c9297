//! Immutable configuration for a cloud field and its layers.
//!
//! A [`FieldConfig`] is built once (defaults, JSON, or serde) and validated
//! before use. Each layer receives a [`LayerConfig`] derived from it.

use cloudfield_core::color::Srgb;
use cloudfield_core::error::CloudError;
use cloudfield_core::params::{param_bool, param_f64, param_string, param_u64, param_usize};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::noise_field::OctaveSet;

pub const DEFAULT_PARTICLE_COUNT: usize = 100;
pub const DEFAULT_LAYER_COUNT: usize = 3;
pub const DEFAULT_FIELD_OPACITY: f64 = 0.85;
pub const DEFAULT_LAYER_OPACITY: f64 = 0.8;
pub const DEFAULT_MOVEMENT_SPEED: f64 = 0.3;
pub const DEFAULT_BASE_SCALE: f64 = 40.0;
pub const DEFAULT_CLOUDS_PER_LAYER: usize = 3;
pub const DEFAULT_GRID_RESOLUTION: f64 = 20.0;
/// Finest grid spacing a config may request, in canvas units.
pub const MIN_GRID_RESOLUTION: f64 = 0.1;
/// Upper bound on `points_per_shape` for random sampling.
pub const MAX_POINTS_PER_SHAPE: usize = 10_000;
pub const DEFAULT_JITTER: f64 = 10.0;
pub const DEFAULT_SCALE_VARIANCE: f64 = 0.3;
/// Placements must be strictly denser than this to become particles.
pub const DEFAULT_DENSITY_THRESHOLD: f64 = 0.3;
pub const DEFAULT_EDGE_PADDING: f64 = 100.0;
pub const DEFAULT_BASE_COLOR_HEX: &str = "#f0f5fa";

fn default_base_color() -> Srgb {
    Srgb::from_rgb8(240, 245, 250)
}

/// How candidate points are drawn inside each cloud shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Regular grid at `resolution` spacing. Even, stippled cores.
    Grid { resolution: f64 },
    /// Uniform random points, up to `points_per_shape`. Irregular texture.
    Random { points_per_shape: usize },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        SamplingStrategy::Grid {
            resolution: DEFAULT_GRID_RESOLUTION,
        }
    }
}

/// How a particle turns noise samples into a velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriftMode {
    /// Independent X and Y components.
    #[default]
    Axis,
    /// Heading and magnitude, for swirl-like motion.
    Polar { angle_offset: f64 },
}

/// Settings for one depth layer's generation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Upper bound on particles kept after thresholding.
    pub particle_target: usize,
    pub base_scale: f64,
    pub base_opacity: f64,
    pub base_color: Srgb,
    /// Maximum drift speed, canvas units per frame.
    pub movement_speed: f64,
    pub sampling: SamplingStrategy,
    /// Uniform positional jitter amplitude (+/-) per axis.
    pub jitter: f64,
    /// Relative scale spread: scale is multiplied by 1 +/- this.
    pub scale_variance: f64,
    pub density_threshold: f64,
    /// Shape centers stay this far from the canvas edges.
    pub edge_padding: f64,
    pub drift: DriftMode,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            particle_target: DEFAULT_PARTICLE_COUNT / DEFAULT_LAYER_COUNT,
            base_scale: DEFAULT_BASE_SCALE,
            base_opacity: DEFAULT_LAYER_OPACITY,
            base_color: default_base_color(),
            movement_speed: DEFAULT_MOVEMENT_SPEED,
            sampling: SamplingStrategy::default(),
            jitter: DEFAULT_JITTER,
            scale_variance: DEFAULT_SCALE_VARIANCE,
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            edge_padding: DEFAULT_EDGE_PADDING,
            drift: DriftMode::default(),
        }
    }
}

fn check(ok: bool, name: &str, reason: &str) -> Result<(), CloudError> {
    if ok {
        Ok(())
    } else {
        Err(CloudError::parameter(name, reason))
    }
}

fn unit_interval(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

impl LayerConfig {
    pub fn validate(&self) -> Result<(), CloudError> {
        check(
            self.base_scale.is_finite() && self.base_scale > 0.0,
            "base_scale",
            "must be positive and finite",
        )?;
        check(unit_interval(self.base_opacity), "base_opacity", "must lie in [0, 1]")?;
        check(non_negative(self.movement_speed), "movement_speed", "must not be negative")?;
        check(non_negative(self.jitter), "jitter", "must not be negative")?;
        check(unit_interval(self.scale_variance), "scale_variance", "must lie in [0, 1]")?;
        check(
            unit_interval(self.density_threshold),
            "density_threshold",
            "must lie in [0, 1]",
        )?;
        check(non_negative(self.edge_padding), "edge_padding", "must not be negative")?;
        match self.sampling {
            SamplingStrategy::Grid { resolution } => {
                if !(resolution.is_finite() && resolution > 0.0) {
                    return Err(CloudError::InvalidGridResolution(resolution));
                }
                check(
                    resolution >= MIN_GRID_RESOLUTION,
                    "sampling.resolution",
                    "must be at least 0.1",
                )?;
            }
            SamplingStrategy::Random { points_per_shape } => check(
                (1..=MAX_POINTS_PER_SHAPE).contains(&points_per_shape),
                "sampling.points_per_shape",
                "must lie in [1, 10000]",
            )?,
        }
        if let DriftMode::Polar { angle_offset } = self.drift {
            check(angle_offset.is_finite(), "drift.angle_offset", "must be finite")?;
        }
        Ok(())
    }
}

/// Whole-field configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Total particle budget, split evenly across layers.
    pub particle_count: usize,
    pub layer_count: usize,
    pub base_color: Srgb,
    pub opacity: f64,
    pub movement_speed: f64,
    pub base_scale: f64,
    /// Seeds both the noise field and every layout draw.
    pub seed: u64,
    /// When off, coherence updates are ignored.
    pub biofeedback_mode: bool,
    pub octaves: OctaveSet,
    pub clouds_per_layer: usize,
    pub sampling: SamplingStrategy,
    pub jitter: f64,
    pub scale_variance: f64,
    pub density_threshold: f64,
    pub edge_padding: f64,
    pub drift: DriftMode,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            layer_count: DEFAULT_LAYER_COUNT,
            base_color: default_base_color(),
            opacity: DEFAULT_FIELD_OPACITY,
            movement_speed: DEFAULT_MOVEMENT_SPEED,
            base_scale: DEFAULT_BASE_SCALE,
            seed: 0,
            biofeedback_mode: false,
            octaves: OctaveSet::default(),
            clouds_per_layer: DEFAULT_CLOUDS_PER_LAYER,
            sampling: SamplingStrategy::default(),
            jitter: DEFAULT_JITTER,
            scale_variance: DEFAULT_SCALE_VARIANCE,
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            edge_padding: DEFAULT_EDGE_PADDING,
            drift: DriftMode::default(),
        }
    }
}

/// Parses an optional nested object with serde, naming the key on failure.
fn nested<T: serde::de::DeserializeOwned>(params: &Value, name: &str) -> Result<Option<T>, CloudError> {
    params
        .get(name)
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()
        .map_err(|e| CloudError::parameter(name, e.to_string()))
}

impl FieldConfig {
    /// Builds a validated config from a flat JSON object, falling back to
    /// defaults for missing keys.
    ///
    /// Scalar keys match the field names. `base_color` is a hex string.
    /// `octaves`, `sampling` and `drift` are nested objects; `grid_resolution`
    /// is accepted as shorthand for grid sampling.
    pub fn from_json(params: &Value) -> Result<Self, CloudError> {
        let d = Self::default();
        let base_color = Srgb::from_hex(&param_string(params, "base_color", DEFAULT_BASE_COLOR_HEX))?;

        let sampling = match nested(params, "sampling")? {
            Some(s) => s,
            None => SamplingStrategy::Grid {
                resolution: param_f64(params, "grid_resolution", DEFAULT_GRID_RESOLUTION),
            },
        };

        let config = Self {
            particle_count: param_usize(params, "particle_count", d.particle_count),
            layer_count: param_usize(params, "layer_count", d.layer_count),
            base_color,
            opacity: param_f64(params, "opacity", d.opacity),
            movement_speed: param_f64(params, "movement_speed", d.movement_speed),
            base_scale: param_f64(params, "base_scale", d.base_scale),
            seed: param_u64(params, "seed", d.seed),
            biofeedback_mode: param_bool(params, "biofeedback_mode", d.biofeedback_mode),
            octaves: nested(params, "octaves")?.unwrap_or(d.octaves),
            clouds_per_layer: param_usize(params, "clouds_per_layer", d.clouds_per_layer),
            sampling,
            jitter: param_f64(params, "jitter", d.jitter),
            scale_variance: param_f64(params, "scale_variance", d.scale_variance),
            density_threshold: param_f64(params, "density_threshold", d.density_threshold),
            edge_padding: param_f64(params, "edge_padding", d.edge_padding),
            drift: nested(params, "drift")?.unwrap_or(d.drift),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that cannot produce a field.
    pub fn validate(&self) -> Result<(), CloudError> {
        if self.layer_count == 0 {
            return Err(CloudError::ZeroLayerCount);
        }
        self.octaves.validate()?;
        self.layer_config().validate()
    }

    /// Noise seed derived from the 64-bit field seed.
    pub fn noise_seed(&self) -> u32 {
        (self.seed ^ (self.seed >> 32)) as u32
    }

    /// Settings shared by every layer of this field.
    pub fn layer_config(&self) -> LayerConfig {
        LayerConfig {
            particle_target: self.particle_count / self.layer_count.max(1),
            base_scale: self.base_scale,
            base_opacity: self.opacity,
            base_color: self.base_color,
            movement_speed: self.movement_speed,
            sampling: self.sampling,
            jitter: self.jitter,
            scale_variance: self.scale_variance,
            density_threshold: self.density_threshold,
            edge_padding: self.edge_padding,
            drift: self.drift,
        }
    }
}
