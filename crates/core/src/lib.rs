#![deny(unsafe_code)]
//! Core types for the cloudfield particle background.
//!
//! Provides the `CloudError` taxonomy, the seeded `Xorshift64` PRNG, JSON
//! parameter helpers, `Srgb` color, the scalar `Field` grid, injectable
//! `NoisePrimitive`s, canvas extents and blend modes, and the `Renderer`
//! contract that render backends implement.

pub mod canvas;
pub mod color;
pub mod error;
pub mod field;
pub mod noise;
pub mod params;
pub mod prng;
pub mod render;

pub use canvas::{BlendMode, CanvasSize};
pub use color::Srgb;
pub use error::CloudError;
pub use field::Field;
pub use noise::{NoisePrimitive, PerlinNoise, SimplexNoise};
pub use prng::Xorshift64;
pub use render::{Renderer, SpriteDraw};
