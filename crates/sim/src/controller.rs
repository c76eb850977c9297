//! The field orchestrator: owns the noise field and every depth layer,
//! drives them once per frame and maps coherence onto modulation.

use cloudfield_core::canvas::CanvasSize;
use cloudfield_core::error::CloudError;
use cloudfield_core::prng::Xorshift64;
use cloudfield_core::render::Renderer;
use glam::DVec2;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::FieldConfig;
use crate::layer::{LayerCompositor, LayerInfo};
use crate::modulation::ModulationParams;
use crate::noise_field::NoiseField;

/// Coherence level assumed when biofeedback is off.
pub const NEUTRAL_COHERENCE: f64 = 0.5;

/// Diagnostic snapshot of a whole field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldInfo {
    pub config: FieldConfig,
    pub canvas: Option<CanvasSize>,
    pub generated: bool,
    pub layer_count: usize,
    pub particle_count: usize,
    pub frame_count: u64,
    /// Accumulated noise time in milliseconds.
    pub time: f64,
    pub noise_seed: u32,
    pub coherence: f64,
    pub biofeedback_mode: bool,
    pub modulation: ModulationParams,
    pub layers: Vec<LayerInfo>,
}

/// Layer depths from far (0) to near (1); a lone layer sits in the middle.
fn layer_depth(index: usize, count: usize) -> f64 {
    if count <= 1 {
        0.5
    } else {
        index as f64 / (count - 1) as f64
    }
}

/// Generates `config.layer_count` layers far to near from one generator.
fn build_layers(
    config: &FieldConfig,
    noise: &NoiseField,
    canvas: CanvasSize,
    rng: &mut Xorshift64,
) -> Result<Vec<LayerCompositor>, CloudError> {
    let count = config.layer_count;
    let layer_config = config.layer_config();
    (0..count)
        .map(|i| {
            let mut layer = LayerCompositor::new(layer_depth(i, count), layer_config.clone())?;
            layer.generate(config.clouds_per_layer, noise, canvas, rng)?;
            Ok(layer)
        })
        .collect()
}

/// Owns a [`NoiseField`] and its [`LayerCompositor`]s.
///
/// The host calls [`generate`](Self::generate) once, then
/// [`update`](Self::update) and [`display`](Self::display) every frame.
#[derive(Debug)]
pub struct FieldController {
    config: FieldConfig,
    noise: NoiseField,
    layers: Vec<LayerCompositor>,
    rng: Xorshift64,
    canvas: Option<CanvasSize>,
    generated: bool,
    coherence: f64,
    modulation: ModulationParams,
    frame_count: u64,
}

impl FieldController {
    /// Validates `config` and builds the noise field. Nothing is generated yet.
    pub fn new(config: FieldConfig) -> Result<Self, CloudError> {
        config.validate()?;
        let noise = NoiseField::new(config.noise_seed(), config.octaves)?;
        Ok(Self {
            rng: Xorshift64::new(config.seed),
            modulation: ModulationParams::neutral(config.base_color),
            config,
            noise,
            layers: Vec::new(),
            canvas: None,
            generated: false,
            coherence: NEUTRAL_COHERENCE,
            frame_count: 0,
        })
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    /// Layers ordered far to near.
    pub fn layers(&self) -> &[LayerCompositor] {
        &self.layers
    }

    pub fn modulation(&self) -> &ModulationParams {
        &self.modulation
    }

    pub fn coherence(&self) -> f64 {
        self.coherence
    }

    pub fn canvas(&self) -> Option<CanvasSize> {
        self.canvas
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn particle_count(&self) -> usize {
        self.layers.iter().map(LayerCompositor::particle_count).sum()
    }

    /// Builds every layer for `canvas`, optionally switching to a new seed
    /// first. Returns the total particle count.
    ///
    /// Layout randomness is drawn from a generator seeded with the field
    /// seed, so the same seed, config and canvas give the same field. The
    /// noise clock is left as is. On failure the previous layers and seed
    /// stay in place.
    pub fn generate(&mut self, canvas: CanvasSize, seed: Option<u64>) -> Result<usize, CloudError> {
        let previous = (self.config.seed, self.noise.seed());
        if let Some(seed) = seed {
            self.config.seed = seed;
            self.noise.reseed(self.config.noise_seed());
        }
        let mut rng = Xorshift64::new(self.config.seed);
        let layers = match build_layers(&self.config, &self.noise, canvas, &mut rng) {
            Ok(layers) => layers,
            Err(e) => {
                self.config.seed = previous.0;
                self.noise.reseed(previous.1);
                warn!(error = %e, "field generation failed");
                return Err(e);
            }
        };
        if let Some(seed) = seed {
            info!(seed, noise_seed = self.noise.seed(), "field reseeded");
        }
        self.install(layers, rng, canvas);
        Ok(self.particle_count())
    }

    fn install(&mut self, layers: Vec<LayerCompositor>, rng: Xorshift64, canvas: CanvasSize) {
        self.layers = layers;
        self.rng = rng;
        self.canvas = Some(canvas);
        self.generated = true;
        debug!(
            layers = self.layers.len(),
            particles = self.particle_count(),
            width = canvas.width(),
            height = canvas.height(),
            "field generated"
        );
    }

    /// The canvas to draw on, or `NotGenerated` (logged) when the field has
    /// not been generated.
    fn ready(&self, operation: &'static str) -> Result<CanvasSize, CloudError> {
        match self.canvas {
            Some(canvas) if self.generated => Ok(canvas),
            _ => {
                warn!(operation, "cloud field used before generate");
                Err(CloudError::NotGenerated)
            }
        }
    }

    /// Advances the noise clock by `delta_ms` and updates every layer at the
    /// new time with the current modulation.
    pub fn update(&mut self, delta_ms: f64) -> Result<(), CloudError> {
        let canvas = self.ready("update")?;
        self.noise.advance(delta_ms);
        let time = self.noise.time();
        for layer in &mut self.layers {
            layer.update(&self.noise, time, &self.modulation, canvas)?;
        }
        self.frame_count += 1;
        Ok(())
    }

    /// Draws all layers far to near.
    pub fn display(&self, renderer: &mut dyn Renderer, camera: DVec2) -> Result<(), CloudError> {
        self.ready("display")?;
        for layer in &self.layers {
            layer.display(renderer, camera)?;
        }
        Ok(())
    }

    /// Feeds a coherence reading in [-1, 1] (clamped). Ignored unless
    /// biofeedback mode is on; non-finite readings are dropped.
    pub fn set_coherence(&mut self, level: f64) {
        if !self.config.biofeedback_mode {
            debug!(level, "coherence ignored: biofeedback mode is off");
            return;
        }
        if !level.is_finite() {
            warn!(level, "non-finite coherence reading dropped");
            return;
        }
        self.coherence = level.clamp(-1.0, 1.0);
        self.modulation = ModulationParams::from_coherence(self.coherence, self.config.base_color);
    }

    /// Turning biofeedback off returns the field to the neutral coherence.
    pub fn set_biofeedback_mode(&mut self, enabled: bool) {
        self.config.biofeedback_mode = enabled;
        if !enabled {
            self.coherence = NEUTRAL_COHERENCE;
            self.modulation =
                ModulationParams::from_coherence(NEUTRAL_COHERENCE, self.config.base_color);
        }
    }

    /// Regenerates on the current canvas with `seed`, or a fresh seed drawn
    /// from the controller's generator, then rewinds the noise clock.
    pub fn regenerate(&mut self, seed: Option<u64>) -> Result<usize, CloudError> {
        let canvas = self.ready("regenerate")?;
        let seed = seed.unwrap_or_else(|| self.rng.next_u64());
        let particles = self.generate(canvas, Some(seed))?;
        self.noise.reset();
        info!(seed, particles, "field regenerated");
        Ok(particles)
    }

    /// Rewinds the noise clock to zero.
    pub fn reset_time(&mut self) {
        self.noise.reset();
    }

    /// Changes the wrap bounds. Existing particles keep their positions;
    /// call [`regenerate`](Self::regenerate) to redistribute them.
    pub fn resize(&mut self, canvas: CanvasSize) {
        self.canvas = Some(canvas);
    }

    /// Swaps in a new configuration.
    ///
    /// The noise field is rebuilt from the new seed and octaves but keeps the
    /// accumulated time. A generated field is generated again on the current
    /// canvas. Nothing changes unless the new config validates and, for a
    /// generated field, its layers build.
    pub fn reconfigure(&mut self, config: FieldConfig) -> Result<(), CloudError> {
        config.validate()?;
        let mut noise = NoiseField::new(config.noise_seed(), config.octaves)?;
        noise.advance(self.noise.time());

        let rebuilt = match (self.generated, self.canvas) {
            (true, Some(canvas)) => {
                let mut rng = Xorshift64::new(config.seed);
                let layers = build_layers(&config, &noise, canvas, &mut rng)?;
                Some((layers, rng, canvas))
            }
            _ => None,
        };

        let was_biofeedback = self.config.biofeedback_mode;
        self.config = config;
        self.noise = noise;
        self.modulation = if self.config.biofeedback_mode {
            ModulationParams::from_coherence(self.coherence, self.config.base_color)
        } else if was_biofeedback {
            self.coherence = NEUTRAL_COHERENCE;
            ModulationParams::from_coherence(NEUTRAL_COHERENCE, self.config.base_color)
        } else {
            ModulationParams::neutral(self.config.base_color)
        };
        if let Some((layers, rng, canvas)) = rebuilt {
            self.install(layers, rng, canvas);
        }
        info!(seed = self.config.seed, "field reconfigured");
        Ok(())
    }

    pub fn info(&self) -> FieldInfo {
        FieldInfo {
            config: self.config.clone(),
            canvas: self.canvas,
            generated: self.generated,
            layer_count: self.layers.len(),
            particle_count: self.particle_count(),
            frame_count: self.frame_count,
            time: self.noise.time(),
            noise_seed: self.noise.seed(),
            coherence: self.coherence,
            biofeedback_mode: self.config.biofeedback_mode,
            modulation: self.modulation,
            layers: self.layers.iter().map(LayerCompositor::info).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudfield_core::canvas::BlendMode;
    use cloudfield_core::color::Srgb;
    use cloudfield_core::render::SpriteDraw;
    use crate::config::{SamplingStrategy, MIN_GRID_RESOLUTION};

    fn canvas() -> CanvasSize {
        CanvasSize::new(800.0, 600.0).unwrap()
    }

    fn config(seed: u64) -> FieldConfig {
        FieldConfig {
            seed,
            ..FieldConfig::default()
        }
    }

    fn generated(seed: u64) -> FieldController {
        let mut c = FieldController::new(config(seed)).unwrap();
        c.generate(canvas(), None).unwrap();
        c
    }

    #[derive(Default)]
    struct Counter {
        pushes: usize,
        pops: usize,
        sprites: usize,
    }

    impl Renderer for Counter {
        fn push(&mut self) {
            self.pushes += 1;
        }
        fn pop(&mut self) {
            self.pops += 1;
        }
        fn translate(&mut self, _offset: DVec2) {}
        fn set_blend_mode(&mut self, _mode: BlendMode) {}
        fn draw_sprite(&mut self, _sprite: &SpriteDraw) {
            self.sprites += 1;
        }
    }

    #[test]
    fn new_rejects_invalid_config() {
        let bad = FieldConfig {
            layer_count: 0,
            ..FieldConfig::default()
        };
        assert!(matches!(
            FieldController::new(bad),
            Err(CloudError::ZeroLayerCount)
        ));
    }

    #[test]
    fn update_display_and_regenerate_require_generate() {
        let mut c = FieldController::new(FieldConfig::default()).unwrap();
        assert!(matches!(c.update(16.67), Err(CloudError::NotGenerated)));
        assert!(matches!(
            c.display(&mut Counter::default(), DVec2::ZERO),
            Err(CloudError::NotGenerated)
        ));
        assert!(matches!(c.regenerate(None), Err(CloudError::NotGenerated)));
        assert_eq!(c.frame_count(), 0);
        assert_eq!(c.noise().time(), 0.0);
    }

    #[test]
    fn layers_span_far_to_near() {
        let c = generated(1);
        let depths: Vec<f64> = c.layers().iter().map(|l| l.depth()).collect();
        assert_eq!(depths, vec![0.0, 0.5, 1.0]);
        for layer in c.layers() {
            assert_eq!(layer.config().particle_target, 33);
            assert!(layer.particle_count() <= 33);
            assert_eq!(layer.shapes().len(), 3);
        }
        assert!(c.particle_count() <= 100);
    }

    #[test]
    fn single_layer_sits_mid_depth() {
        let mut c = FieldController::new(FieldConfig {
            layer_count: 1,
            ..FieldConfig::default()
        })
        .unwrap();
        c.generate(canvas(), None).unwrap();
        assert_eq!(c.layers()[0].depth(), 0.5);
        assert_eq!(c.layers()[0].config().particle_target, 100);
    }

    #[test]
    fn same_seed_reproduces_the_field() {
        let a = generated(99);
        let b = generated(99);
        assert_eq!(a.particle_count(), b.particle_count());
        for (la, lb) in a.layers().iter().zip(b.layers()) {
            assert_eq!(la.particles(), lb.particles());
        }
    }

    #[test]
    fn update_advances_time_and_frames() {
        let mut c = generated(3);
        for _ in 0..10 {
            c.update(16.0).unwrap();
        }
        assert_eq!(c.frame_count(), 10);
        assert!((c.noise().time() - 160.0).abs() < 1e-9);
        for layer in c.layers() {
            for p in layer.particles() {
                assert!(p.position.is_finite());
            }
        }
    }

    #[test]
    fn display_visits_every_layer() {
        let c = generated(5);
        let mut r = Counter::default();
        c.display(&mut r, DVec2::new(4.0, 2.0)).unwrap();
        assert_eq!(r.pushes, 3);
        assert_eq!(r.pops, 3);
        assert!(r.sprites <= c.particle_count());
    }

    #[test]
    fn coherence_is_ignored_without_biofeedback() {
        let mut c = generated(1);
        c.set_coherence(-1.0);
        assert_eq!(c.coherence(), NEUTRAL_COHERENCE);
        assert_eq!(
            *c.modulation(),
            ModulationParams::neutral(c.config().base_color)
        );
    }

    #[test]
    fn coherence_drives_modulation_with_biofeedback() {
        let mut c = generated(1);
        c.set_biofeedback_mode(true);
        c.set_coherence(4.0);
        assert_eq!(c.coherence(), 1.0);
        assert_eq!(c.modulation().layer_separation, Some(1.2));

        c.set_coherence(f64::NAN);
        assert_eq!(c.coherence(), 1.0);

        c.update(16.0).unwrap();
        for layer in c.layers() {
            assert_eq!(layer.separation_modulation(), 1.2);
        }
    }

    #[test]
    fn disabling_biofeedback_returns_to_neutral_coherence() {
        let mut c = generated(1);
        c.set_biofeedback_mode(true);
        c.set_coherence(-0.8);
        c.set_biofeedback_mode(false);
        assert_eq!(c.coherence(), NEUTRAL_COHERENCE);
        assert_eq!(
            *c.modulation(),
            ModulationParams::from_coherence(0.5, c.config().base_color)
        );
    }

    #[test]
    fn regenerate_with_seed_resets_time() {
        let mut c = generated(1);
        c.update(100.0).unwrap();
        c.regenerate(Some(77)).unwrap();
        assert_eq!(c.config().seed, 77);
        assert_eq!(c.noise().time(), 0.0);
        assert_eq!(c.noise().seed(), 77);

        let fresh = generated(77);
        for (a, b) in c.layers().iter().zip(fresh.layers()) {
            assert_eq!(a.particles(), b.particles());
        }
    }

    #[test]
    fn regenerate_without_seed_draws_a_new_one() {
        let mut c = generated(1);
        c.regenerate(None).unwrap();
        assert_ne!(c.config().seed, 1);
        assert!(c.is_generated());
    }

    #[test]
    fn resize_keeps_particle_positions() {
        let mut c = generated(2);
        let before: Vec<DVec2> = c.layers()[0].particles().iter().map(|p| p.position).collect();
        c.resize(CanvasSize::new(1920.0, 1080.0).unwrap());
        let after: Vec<DVec2> = c.layers()[0].particles().iter().map(|p| p.position).collect();
        assert_eq!(before, after);
        assert_eq!(c.canvas().map(|s| s.width()), Some(1920.0));
    }

    #[test]
    fn reconfigure_keeps_time_and_regenerates() {
        let mut c = generated(2);
        c.update(500.0).unwrap();
        let new = FieldConfig {
            layer_count: 2,
            seed: 2,
            ..FieldConfig::default()
        };
        c.reconfigure(new).unwrap();
        assert_eq!(c.layers().len(), 2);
        assert!((c.noise().time() - 500.0).abs() < 1e-9);
        assert!(c.is_generated());

        assert!(matches!(
            c.reconfigure(FieldConfig {
                layer_count: 0,
                ..FieldConfig::default()
            }),
            Err(CloudError::ZeroLayerCount)
        ));
        assert_eq!(c.layers().len(), 2);
    }

    #[test]
    fn failed_reconfigure_keeps_the_running_field() {
        let mut c = generated(7);
        c.update(100.0).unwrap();
        let before = c.config().clone();
        let particles = c.particle_count();

        // Validates, but the finest spacing is too dense for any layout shape.
        let dense = FieldConfig {
            seed: 99,
            sampling: SamplingStrategy::Grid {
                resolution: MIN_GRID_RESOLUTION,
            },
            ..FieldConfig::default()
        };
        assert!(dense.validate().is_ok());
        assert!(matches!(
            c.reconfigure(dense),
            Err(CloudError::GridTooDense { .. })
        ));

        assert_eq!(c.config(), &before);
        assert!(c.is_generated());
        assert_eq!(c.particle_count(), particles);
        assert_eq!(c.noise().seed(), before.noise_seed());
        assert!(c.update(16.0).is_ok());
    }

    #[test]
    fn failed_generate_keeps_previous_seed_and_layers() {
        let mut c = FieldController::new(FieldConfig {
            seed: 3,
            sampling: SamplingStrategy::Grid {
                resolution: MIN_GRID_RESOLUTION,
            },
            ..FieldConfig::default()
        })
        .unwrap();
        assert!(c.generate(canvas(), Some(11)).is_err());
        assert_eq!(c.config().seed, 3);
        assert_eq!(c.noise().seed(), c.config().noise_seed());
        assert!(!c.is_generated());
    }

    #[test]
    fn reconfigure_before_generate_stays_ungenerated() {
        let mut c = FieldController::new(FieldConfig::default()).unwrap();
        c.reconfigure(FieldConfig {
            base_color: Srgb::WHITE,
            ..FieldConfig::default()
        })
        .unwrap();
        assert!(!c.is_generated());
        assert_eq!(c.modulation().color_temp, Some(Srgb::WHITE));
    }

    #[test]
    fn info_reports_layers_and_serializes() {
        let mut c = generated(4);
        c.update(16.0).unwrap();
        let info = c.info();
        assert_eq!(info.layer_count, 3);
        assert_eq!(info.layers.len(), 3);
        assert_eq!(info.frame_count, 1);
        assert_eq!(info.particle_count, c.particle_count());
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["config"]["seed"], 4);
        assert_eq!(json["generated"], true);
    }
}
