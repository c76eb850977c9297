//! Canvas extent and blend modes shared by the simulation and render backends.

use serde::{Deserialize, Serialize};

use crate::error::CloudError;

/// How a layer's sprites combine with what is already drawn.
///
/// Cloud layers draw with `Additive` so overlapping sprites brighten rather
/// than occlude; `Normal` is restored once a layer finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
}

/// Width and height of the drawing surface, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    width: f64,
    height: f64,
}

impl CanvasSize {
    /// Returns `CloudError::InvalidDimensions` unless both extents are
    /// positive and finite.
    pub fn new(width: f64, height: f64) -> Result<Self, CloudError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(CloudError::InvalidDimensions);
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Pixel dimensions, rounded up.
    pub fn pixels(&self) -> (usize, usize) {
        (self.width.ceil() as usize, self.height.ceil() as usize)
    }
}
