#![deny(unsafe_code)]
//! Layered cloud particle field.
//!
//! A [`NoiseField`] supplies slowly evolving multi-octave density. Each
//! [`LayerCompositor`] lays out elliptical [`ShapeRegion`]s, keeps the dense
//! samples inside them as [`CloudParticle`]s and drifts those particles
//! through the field every frame. [`FieldController`] owns the noise field
//! and every layer, and turns a coherence signal into [`ModulationParams`].

pub mod config;
pub mod controller;
pub mod layer;
pub mod modulation;
pub mod noise_field;
pub mod particle;
pub mod shape;

pub use config::{DriftMode, FieldConfig, LayerConfig, SamplingStrategy};
pub use controller::{FieldController, FieldInfo};
pub use layer::{LayerCompositor, LayerInfo, LayerTransform};
pub use modulation::ModulationParams;
pub use noise_field::{NoiseField, Octave, OctaveSet};
pub use particle::CloudParticle;
pub use shape::{Placement, ShapeRegion};
