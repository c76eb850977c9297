//! Rotated elliptical regions that decide where cloud density may exist.
//!
//! A [`ShapeRegion`] is the "base mesh" of one cloud: particles are only ever
//! placed inside it, and noise varies their density rather than defining
//! the cloud's outline.

use std::f64::consts::PI;

use cloudfield_core::error::CloudError;
use cloudfield_core::prng::Xorshift64;
use glam::DVec2;
use serde::Serialize;

use crate::noise_field::NoiseField;

/// Candidate draws per requested point in [`ShapeRegion::sample_random`].
const RANDOM_ATTEMPTS_PER_POINT: usize = 3;

/// Most grid points [`ShapeRegion::sample_grid`] will visit for one shape.
pub const MAX_GRID_POINTS: usize = 1 << 20;

/// A sample point inside a shape, with its noise-derived density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: DVec2,
    /// Density in [0, 1]: noise times the center falloff.
    pub density: f64,
    /// Normalized elliptical distance from the center; at most 1.0.
    pub distance_from_center: f64,
}

/// A rotated ellipse with a per-shape noise seed.
///
/// Immutable once built. Zero extents are allowed and describe a degenerate
/// shape that yields no samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeRegion {
    center: DVec2,
    width: f64,
    height: f64,
    rotation: f64,
    seed: f64,
}

impl ShapeRegion {
    /// Creates a shape centered at `center` with full extents `width` x
    /// `height`, rotated by `rotation` radians.
    ///
    /// `seed` offsets this shape's noise lookups so neighbouring clouds do not
    /// share a density pattern.
    pub fn new(
        center: DVec2,
        width: f64,
        height: f64,
        rotation: f64,
        seed: f64,
    ) -> Result<Self, CloudError> {
        if !center.is_finite() || !rotation.is_finite() || !seed.is_finite() {
            return Err(CloudError::InvalidShape(
                "center, rotation and seed must be finite".into(),
            ));
        }
        if !(width.is_finite() && width >= 0.0 && height.is_finite() && height >= 0.0) {
            return Err(CloudError::InvalidShape(format!(
                "extents must be non-negative and finite, got {width} x {height}"
            )));
        }
        Ok(Self {
            center,
            width,
            height,
            rotation,
            seed,
        })
    }

    pub fn center(&self) -> DVec2 {
        self.center
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn seed(&self) -> f64 {
        self.seed
    }

    pub fn area(&self) -> f64 {
        PI * (self.width / 2.0) * (self.height / 2.0)
    }

    /// True when either extent is zero.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }

    /// Normalized elliptical distance of `point` from the center.
    ///
    /// The point is rotated into shape-local axes, each axis is divided by the
    /// half-extent scaled by `falloff`, and the Euclidean norm is returned.
    /// `<= 1.0` is inside. A zero half-extent contributes nothing for points
    /// on its axis and infinity otherwise.
    pub fn contains(&self, point: DVec2, falloff: f64) -> f64 {
        let local = DVec2::from_angle(-self.rotation).rotate(point - self.center);
        let term = |offset: f64, extent: f64| {
            let half = extent * falloff / 2.0;
            if half == 0.0 {
                if offset == 0.0 {
                    0.0
                } else {
                    f64::INFINITY
                }
            } else {
                (offset * offset) / (half * half)
            }
        };
        (term(local.x, self.width) + term(local.y, self.height)).sqrt()
    }

    /// Axis-aligned `(min, max)` corners enclosing the rotated ellipse.
    pub fn bounding_box(&self) -> (DVec2, DVec2) {
        let (sin, cos) = self.rotation.sin_cos();
        let a = self.width / 2.0;
        let b = self.height / 2.0;
        let half = DVec2::new(
            ((a * cos).powi(2) + (b * sin).powi(2)).sqrt(),
            ((a * sin).powi(2) + (b * cos).powi(2)).sqrt(),
        );
        (self.center - half, self.center + half)
    }

    /// Density at a point already known to lie `distance` from the center.
    ///
    /// The `sqrt` falloff keeps cores dense and plateau-like instead of conical.
    fn density_at(&self, point: DVec2, distance: f64, noise: &NoiseField) -> f64 {
        let n = noise.sample_2d(point.x + self.seed, point.y + self.seed, 0.0);
        (n * (1.0 - distance.sqrt())).clamp(0.0, 1.0)
    }

    fn place(&self, position: DVec2, noise: &NoiseField) -> Option<Placement> {
        let distance = self.contains(position, 1.0);
        (distance <= 1.0).then(|| Placement {
            position,
            density: self.density_at(position, distance, noise),
            distance_from_center: distance,
        })
    }

    /// Samples a regular grid at `resolution` spacing over the bounding box,
    /// keeping points inside the ellipse.
    ///
    /// Columns run left to right, each column top to bottom. Both box edges
    /// are included when they fall on the grid. Returns
    /// `CloudError::InvalidGridResolution` for non-positive or non-finite
    /// spacing and `CloudError::GridTooDense` when the grid over the bounding
    /// box would exceed [`MAX_GRID_POINTS`].
    pub fn sample_grid(
        &self,
        resolution: f64,
        noise: &NoiseField,
    ) -> Result<Vec<Placement>, CloudError> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(CloudError::InvalidGridResolution(resolution));
        }
        if self.is_degenerate() {
            return Ok(Vec::new());
        }
        let (min, max) = self.bounding_box();
        let steps = ((max - min) / resolution).floor();
        let points = (steps.x + 1.0) * (steps.y + 1.0);
        if !(points <= MAX_GRID_POINTS as f64) {
            return Err(CloudError::GridTooDense {
                resolution,
                points,
                limit: MAX_GRID_POINTS,
            });
        }
        let (cols, rows) = (steps.x as usize, steps.y as usize);

        let placements = (0..=cols)
            .flat_map(|i| (0..=rows).map(move |j| (i, j)))
            .filter_map(|(i, j)| {
                let position = min + DVec2::new(i as f64, j as f64) * resolution;
                self.place(position, noise)
            })
            .collect();
        Ok(placements)
    }

    /// Draws up to `count` points uniformly over the ellipse's area.
    ///
    /// Makes `count * 3` candidate draws (polar, with a square-rooted radius
    /// for uniform areal density) and stops once `count` are accepted.
    pub fn sample_random(
        &self,
        count: usize,
        noise: &NoiseField,
        rng: &mut Xorshift64,
    ) -> Vec<Placement> {
        if self.is_degenerate() {
            return Vec::new();
        }
        let rotation = DVec2::from_angle(self.rotation);
        let half = DVec2::new(self.width / 2.0, self.height / 2.0);
        let mut placements = Vec::new();
        for _ in 0..count.saturating_mul(RANDOM_ATTEMPTS_PER_POINT) {
            if placements.len() >= count {
                break;
            }
            let angle = rng.next_angle();
            let radius = rng.next_f64().sqrt();
            let local = DVec2::from_angle(angle) * half * radius;
            let position = self.center + rotation.rotate(local);
            if let Some(p) = self.place(position, noise) {
                placements.push(p);
            }
        }
        placements
    }
}
