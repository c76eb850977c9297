//! Multi-scale, slowly evolving noise field.
//!
//! Three octaves (large, medium, fine) are sampled from one injected
//! [`NoisePrimitive`], each with its own spatial scale, weight and time rate,
//! and combined into a weighted average in [0, 1]. The large octave carries
//! most of the weight so broad cloud masses dominate fine texture, and every
//! time rate is tiny (per millisecond) so the field drifts almost
//! imperceptibly.
//!
//! Octaves share one seed; distinct additive offsets per octave keep them
//! from sampling the same lattice cells.

use std::f64::consts::TAU;
use std::fmt;

use cloudfield_core::error::CloudError;
use cloudfield_core::field::Field;
use cloudfield_core::noise::{NoisePrimitive, PerlinNoise};
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Per-octave coordinate offsets `(x, y)`, indexed large, medium, fine.
const OCTAVE_OFFSETS: [(f64, f64); 3] = [(0.0, 0.0), (1000.0, 500.0), (2000.0, 1500.0)];

/// Offset separating the X and Y drift samples so the two axes are uncorrelated.
const DRIFT_DECORRELATION: f64 = 10_000.0;

/// One weighted noise component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Octave {
    /// Divisor applied to spatial coordinates. Larger means broader features.
    pub spatial_scale: f64,
    /// Contribution to the weighted average.
    pub weight: f64,
    /// Time multiplier, in field units per millisecond.
    pub time_rate: f64,
}

impl Octave {
    pub const fn new(spatial_scale: f64, weight: f64, time_rate: f64) -> Self {
        Self {
            spatial_scale,
            weight,
            time_rate,
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), CloudError> {
        let invalid = |reason| Err(CloudError::InvalidOctave { octave: name, reason });
        if !(self.spatial_scale.is_finite() && self.spatial_scale > 0.0) {
            return invalid("spatial scale must be positive and finite");
        }
        if !(self.weight.is_finite() && self.weight >= 0.0) {
            return invalid("weight must be non-negative and finite");
        }
        if !(self.time_rate.is_finite() && self.time_rate > 0.0) {
            return invalid("time rate must be positive and finite");
        }
        Ok(())
    }
}

/// The three octaves that make up a [`NoiseField`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctaveSet {
    pub large: Octave,
    pub medium: Octave,
    pub fine: Octave,
}

impl Default for OctaveSet {
    fn default() -> Self {
        Self {
            large: Octave::new(512.0, 1.0, 0.0001),
            medium: Octave::new(12.25, 0.3, 0.0002),
            fine: Octave::new(0.12, 0.1, 0.0003),
        }
    }
}

impl OctaveSet {
    /// Checks every octave and that the weights do not sum to zero.
    pub fn validate(&self) -> Result<(), CloudError> {
        self.large.validate("large")?;
        self.medium.validate("medium")?;
        self.fine.validate("fine")?;
        if self.total_weight() <= 0.0 {
            return Err(CloudError::ZeroOctaveWeight);
        }
        Ok(())
    }

    pub fn total_weight(&self) -> f64 {
        self.large.weight + self.medium.weight + self.fine.weight
    }

    fn iter(&self) -> impl Iterator<Item = (&Octave, (f64, f64))> {
        [&self.large, &self.medium, &self.fine]
            .into_iter()
            .zip(OCTAVE_OFFSETS)
    }
}

/// Seeded multi-octave noise with an accumulated animation clock.
///
/// Sampling is pure: it depends only on the seed, the octaves and the
/// arguments. The clock (`time()`) is only changed by [`advance`](Self::advance)
/// and [`reset`](Self::reset).
pub struct NoiseField {
    seed: u32,
    octaves: OctaveSet,
    total_weight: f64,
    time_offset: f64,
    primitive: Box<dyn NoisePrimitive>,
}

impl fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseField")
            .field("seed", &self.seed)
            .field("octaves", &self.octaves)
            .field("time_offset", &self.time_offset)
            .field("primitive_seed", &self.primitive.seed())
            .finish()
    }
}

impl NoiseField {
    /// Creates a field over Perlin noise seeded with `seed`.
    ///
    /// Returns an error if the octave set is invalid (see [`OctaveSet::validate`]).
    pub fn new(seed: u32, octaves: OctaveSet) -> Result<Self, CloudError> {
        Self::with_primitive(seed, octaves, Box::new(PerlinNoise::new(seed)))
    }

    /// Creates a field over an arbitrary noise primitive.
    pub fn with_primitive(
        seed: u32,
        octaves: OctaveSet,
        primitive: Box<dyn NoisePrimitive>,
    ) -> Result<Self, CloudError> {
        octaves.validate()?;
        Ok(Self {
            seed,
            total_weight: octaves.total_weight(),
            octaves,
            time_offset: 0.0,
            primitive,
        })
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn octaves(&self) -> &OctaveSet {
        &self.octaves
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Accumulated time in milliseconds.
    pub fn time(&self) -> f64 {
        self.time_offset
    }

    /// Weighted multi-octave sample at `(x, y)` and `time`, in [0, 1].
    pub fn sample_2d(&self, x: f64, y: f64, time: f64) -> f64 {
        let seed = self.seed as f64;
        self.compose(|octave, (ox, oy)| {
            [
                (x + seed + ox) / octave.spatial_scale,
                (y + oy) / octave.spatial_scale,
                time * octave.time_rate,
            ]
        })
    }

    /// Volumetric variant: `z` is folded into the time-scaled axis and divided
    /// by the octave's spatial scale like the other coordinates.
    pub fn sample_3d(&self, x: f64, y: f64, z: f64, time: f64) -> f64 {
        let seed = self.seed as f64;
        self.compose(|octave, (ox, oy)| {
            let scale = octave.spatial_scale;
            [
                (x + seed + ox) / scale,
                (y + oy) / scale,
                (z + time * octave.time_rate) / scale,
            ]
        })
    }

    /// `sample_2d` linearly remapped onto [min, max].
    pub fn sample_mapped(&self, x: f64, y: f64, time: f64, min: f64, max: f64) -> f64 {
        min + self.sample_2d(x, y, time) * (max - min)
    }

    fn compose(&self, point: impl Fn(&Octave, (f64, f64)) -> [f64; 3]) -> f64 {
        let combined: f64 = self
            .octaves
            .iter()
            .map(|(octave, offset)| self.primitive.sample(point(octave, offset)) * octave.weight)
            .sum();
        (combined / self.total_weight).clamp(0.0, 1.0)
    }

    fn drift_pair(&self, seed_x: f64, seed_y: f64, time: f64) -> (f64, f64) {
        let nx = self.sample_2d(seed_x, seed_y, time);
        let ny = self.sample_2d(
            seed_x + DRIFT_DECORRELATION,
            seed_y + DRIFT_DECORRELATION,
            time,
        );
        (nx, ny)
    }

    /// Independent-axis drift: each axis is a [0, 1] sample remapped to
    /// [-0.5, 0.5] and scaled by `max_speed`.
    ///
    /// Sampling at fixed `(seed_x, seed_y)` gives a particle a continuous
    /// personal drift path as `time` advances.
    pub fn drift_velocity(&self, seed_x: f64, seed_y: f64, max_speed: f64, time: f64) -> DVec2 {
        let (nx, ny) = self.drift_pair(seed_x, seed_y, time);
        DVec2::new((nx - 0.5) * max_speed, (ny - 0.5) * max_speed)
    }

    /// Polar drift: one sample picks the heading (a full turn plus
    /// `angle_offset`), the other the magnitude in [0, max_speed].
    pub fn drift_velocity_polar(
        &self,
        seed_x: f64,
        seed_y: f64,
        max_speed: f64,
        time: f64,
        angle_offset: f64,
    ) -> DVec2 {
        let (nx, ny) = self.drift_pair(seed_x, seed_y, time);
        let angle = nx * TAU + angle_offset;
        DVec2::from_angle(angle) * (ny * max_speed)
    }

    /// Advances the clock by `delta_ms`. Negative and non-finite deltas are
    /// ignored so the clock stays monotonic.
    pub fn advance(&mut self, delta_ms: f64) {
        if delta_ms.is_finite() && delta_ms > 0.0 {
            self.time_offset += delta_ms;
        }
    }

    /// Rewinds the clock to zero.
    pub fn reset(&mut self) {
        self.time_offset = 0.0;
    }

    /// Replaces the coordinate seed. The clock, octaves and primitive are untouched.
    pub fn reseed(&mut self, seed: u32) {
        self.seed = seed;
    }

    /// Rasterizes `sample_2d` at `time` into a `width x height` grid, one
    /// sample per `resolution x resolution` block.
    pub fn visualize(
        &self,
        width: usize,
        height: usize,
        resolution: usize,
        time: f64,
    ) -> Result<Field, CloudError> {
        if resolution == 0 {
            return Err(CloudError::InvalidGridResolution(0.0));
        }
        let mut field = Field::new(width, height)?;
        for y in (0..height).step_by(resolution) {
            for x in (0..width).step_by(resolution) {
                let value = self.sample_2d(x as f64, y as f64, time);
                field.fill_block(x, y, resolution, value);
            }
        }
        Ok(field)
    }
}
