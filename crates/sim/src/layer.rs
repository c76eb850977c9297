//! Depth layers: generation of particles inside cloud shapes, per-frame
//! drift, and the render transform for one stratum of the field.

use cloudfield_core::canvas::{BlendMode, CanvasSize};
use cloudfield_core::error::CloudError;
use cloudfield_core::prng::Xorshift64;
use cloudfield_core::render::Renderer;
use glam::DVec2;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{LayerConfig, SamplingStrategy};
use crate::modulation::ModulationParams;
use crate::noise_field::NoiseField;
use crate::particle::CloudParticle;
use crate::shape::{Placement, ShapeRegion};

/// Vertical spread between the nearest and farthest layer at unit separation.
pub const SEPARATION_SPAN: f64 = 50.0;
/// Spawn scale grows with `density^DENSITY_SCALE_EXPONENT`.
pub const DENSITY_SCALE_EXPONENT: f64 = 0.7;

const SHAPE_MIN_WIDTH: f64 = 150.0;
const SHAPE_MAX_WIDTH: f64 = 350.0;
const SHAPE_MIN_ASPECT: f64 = 0.6;
const SHAPE_MAX_ASPECT: f64 = 1.2;
const SHAPE_SEED_RANGE: f64 = 10_000.0;
const SHAPE_SEED_DEPTH_STRIDE: f64 = 1_000.0;

/// Whether a placement with `density` becomes a particle.
///
/// The threshold is exclusive: a density exactly at it is rejected.
pub(crate) fn accepts(density: f64, threshold: f64) -> bool {
    density > threshold
}

/// Keeps an evenly strided subset of exactly `target` items, preserving order.
fn cap_to_target<T>(items: Vec<T>, target: usize) -> Vec<T> {
    let len = items.len();
    if len <= target {
        return items;
    }
    let mut next = 0;
    let mut kept = 0;
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if kept < target && i == next {
                kept += 1;
                next = kept * len / target;
                Some(item)
            } else {
                None
            }
        })
        .collect()
}

/// The pure part of a layer's per-frame render transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerTransform {
    /// Camera offset scaled by the layer's parallax factor.
    pub parallax: DVec2,
    /// Depth separation offset (vertical only).
    pub separation: DVec2,
    pub blend: BlendMode,
}

/// Diagnostic snapshot of a layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerInfo {
    pub depth: f64,
    pub particle_count: usize,
    pub shape_count: usize,
    pub particle_target: usize,
    pub depth_scale: f64,
    pub depth_alpha: f64,
    pub parallax_factor: f64,
    pub separation_modulation: f64,
    pub generated: bool,
}

/// One depth stratum of the cloud field.
///
/// Depth 0 is far, 1 is near. The depth factors are fixed at construction;
/// after generation only particle motion and `separation_modulation` change.
#[derive(Debug, Clone)]
pub struct LayerCompositor {
    depth: f64,
    depth_scale: f64,
    depth_alpha: f64,
    parallax_factor: f64,
    separation_modulation: f64,
    config: LayerConfig,
    particles: Vec<CloudParticle>,
    shapes: Vec<ShapeRegion>,
    generated: bool,
}

impl LayerCompositor {
    /// Creates an empty layer at `depth`.
    ///
    /// Returns `CloudError::InvalidDepth` outside [0, 1], or the config's own
    /// validation error.
    pub fn new(depth: f64, config: LayerConfig) -> Result<Self, CloudError> {
        if !(0.0..=1.0).contains(&depth) {
            return Err(CloudError::InvalidDepth(depth));
        }
        config.validate()?;
        Ok(Self {
            depth,
            depth_scale: 0.5 + depth * 0.5,
            depth_alpha: 0.4 + depth * 0.6,
            parallax_factor: depth * 0.3,
            separation_modulation: 1.0,
            config,
            particles: Vec::new(),
            shapes: Vec::new(),
            generated: false,
        })
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Scale multiplier in [0.5, 1.0]; near layers draw larger sprites.
    pub fn depth_scale(&self) -> f64 {
        self.depth_scale
    }

    /// Opacity multiplier in [0.4, 1.0]; far layers are fainter.
    pub fn depth_alpha(&self) -> f64 {
        self.depth_alpha
    }

    /// Parallax multiplier in [0, 0.3].
    pub fn parallax_factor(&self) -> f64 {
        self.parallax_factor
    }

    pub fn separation_modulation(&self) -> f64 {
        self.separation_modulation
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn particles(&self) -> &[CloudParticle] {
        &self.particles
    }

    /// Shapes from the last generation pass, kept for diagnostics.
    pub fn shapes(&self) -> &[ShapeRegion] {
        &self.shapes
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Drops all particles and shapes; the layer must be generated again
    /// before it can update or display.
    pub fn clear(&mut self) {
        self.particles.clear();
        self.shapes.clear();
        self.generated = false;
    }

    /// Replaces the layer's contents with particles spawned inside `count`
    /// fresh cloud shapes. Returns the number of particles kept.
    ///
    /// All random draws come from `rng`, so the same generator state, noise
    /// field and canvas reproduce the same layout. Placements at or below the
    /// density threshold are dropped; if more than the layer's target remain,
    /// an evenly spread subset of exactly `particle_target` is kept.
    pub fn generate(
        &mut self,
        count: usize,
        noise: &NoiseField,
        canvas: CanvasSize,
        rng: &mut Xorshift64,
    ) -> Result<usize, CloudError> {
        self.clear();
        let shapes = self.layout_shapes(count, canvas, rng)?;

        let mut spawned = Vec::new();
        let mut candidates = 0;
        for shape in &shapes {
            let placements = self.sample(shape, noise, rng)?;
            candidates += placements.len();
            for placement in placements {
                if accepts(placement.density, self.config.density_threshold) {
                    spawned.push(self.spawn(&placement, shape, rng));
                }
            }
        }
        let accepted = spawned.len();

        self.particles = cap_to_target(spawned, self.config.particle_target);
        self.shapes = shapes;
        self.generated = true;
        debug!(
            depth = self.depth,
            shapes = self.shapes.len(),
            candidates,
            accepted,
            kept = self.particles.len(),
            "layer generated"
        );
        Ok(self.particles.len())
    }

    fn layout_shapes(
        &self,
        count: usize,
        canvas: CanvasSize,
        rng: &mut Xorshift64,
    ) -> Result<Vec<ShapeRegion>, CloudError> {
        let padding = self.config.edge_padding;
        // Canvases narrower than twice the padding collapse onto the center line.
        let axis = |rng: &mut Xorshift64, extent: f64| {
            let inset = padding.min(extent / 2.0);
            inset + rng.next_f64() * (extent - 2.0 * inset)
        };
        (0..count)
            .map(|_| {
                let x = axis(rng, canvas.width());
                let y = axis(rng, canvas.height());
                let width = rng.next_range(SHAPE_MIN_WIDTH, SHAPE_MAX_WIDTH);
                let aspect = rng.next_range(SHAPE_MIN_ASPECT, SHAPE_MAX_ASPECT);
                let rotation = rng.next_angle();
                let seed = (rng.next_f64() * SHAPE_SEED_RANGE).floor()
                    + self.depth * SHAPE_SEED_DEPTH_STRIDE;
                ShapeRegion::new(DVec2::new(x, y), width, width * aspect, rotation, seed)
            })
            .collect()
    }

    fn sample(
        &self,
        shape: &ShapeRegion,
        noise: &NoiseField,
        rng: &mut Xorshift64,
    ) -> Result<Vec<Placement>, CloudError> {
        match self.config.sampling {
            SamplingStrategy::Grid { resolution } => shape.sample_grid(resolution, noise),
            SamplingStrategy::Random { points_per_shape } => {
                Ok(shape.sample_random(points_per_shape, noise, rng))
            }
        }
    }

    /// Builds a particle for an accepted placement. Depth factors are applied
    /// here, once.
    fn spawn(&self, placement: &Placement, shape: &ShapeRegion, rng: &mut Xorshift64) -> CloudParticle {
        let c = &self.config;
        let jitter = DVec2::new(rng.next_signed(c.jitter), rng.next_signed(c.jitter));
        let scale = c.base_scale
            * placement.density.powf(DENSITY_SCALE_EXPONENT)
            * (1.0 + rng.next_signed(c.scale_variance));

        let mut particle = CloudParticle::new(
            placement.position + jitter,
            scale * self.depth_scale,
            c.base_opacity * self.depth_alpha,
            c.base_color,
            c.movement_speed,
        );
        particle.depth = self.depth;
        particle.density = placement.density;
        particle.shape_seed = shape.seed();
        particle.drift = c.drift;
        particle
    }

    /// Advances every particle one frame.
    ///
    /// `layer_separation`, when present and finite, replaces the current
    /// separation; otherwise the previous value is kept.
    pub fn update(
        &mut self,
        noise: &NoiseField,
        time: f64,
        modulation: &ModulationParams,
        canvas: CanvasSize,
    ) -> Result<(), CloudError> {
        if !self.generated {
            warn!(depth = self.depth, "layer update before generate");
            return Err(CloudError::NotGenerated);
        }
        if let Some(separation) = modulation.layer_separation.filter(|s| s.is_finite()) {
            self.separation_modulation = separation;
        }
        for particle in &mut self.particles {
            particle.update(noise, time, modulation, canvas);
        }
        Ok(())
    }

    /// Render transform for a camera offset.
    pub fn transform(&self, camera: DVec2) -> LayerTransform {
        LayerTransform {
            parallax: camera * self.parallax_factor,
            separation: DVec2::new(
                0.0,
                (self.depth - 0.5) * SEPARATION_SPAN * self.separation_modulation,
            ),
            blend: BlendMode::Additive,
        }
    }

    /// Draws the layer: additive blend, parallax and separation translations,
    /// visible particles in order, then the previous state is restored.
    pub fn display(&self, renderer: &mut dyn Renderer, camera: DVec2) -> Result<(), CloudError> {
        if !self.generated {
            warn!(depth = self.depth, "layer display before generate");
            return Err(CloudError::NotGenerated);
        }
        let t = self.transform(camera);
        renderer.push();
        renderer.set_blend_mode(t.blend);
        renderer.translate(t.parallax);
        renderer.translate(t.separation);
        for particle in self.particles.iter().filter(|p| p.is_visible()) {
            renderer.draw_sprite(&particle.sprite());
        }
        renderer.set_blend_mode(BlendMode::Normal);
        renderer.pop();
        Ok(())
    }

    pub fn info(&self) -> LayerInfo {
        LayerInfo {
            depth: self.depth,
            particle_count: self.particles.len(),
            shape_count: self.shapes.len(),
            particle_target: self.config.particle_target,
            depth_scale: self.depth_scale,
            depth_alpha: self.depth_alpha,
            parallax_factor: self.parallax_factor,
            separation_modulation: self.separation_modulation,
            generated: self.generated,
        }
    }
}
