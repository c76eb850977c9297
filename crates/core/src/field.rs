//! Two-dimensional scalar grid with values clamped to [0, 1].
//!
//! Used to rasterize noise density for inspection. Storage is row-major,
//! `width * height` cells.

use crate::error::CloudError;

/// A 2D scalar grid with values clamped to [0, 1].
#[derive(Debug, Clone)]
pub struct Field {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl Field {
    /// Creates a zero-filled field of the given dimensions.
    ///
    /// Returns `CloudError::InvalidDimensions` if either dimension is zero
    /// or if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Result<Self, CloudError> {
        if width == 0 || height == 0 {
            return Err(CloudError::InvalidDimensions);
        }
        let len = width
            .checked_mul(height)
            .ok_or(CloudError::InvalidDimensions)?;
        Ok(Self {
            width,
            height,
            data: vec![0.0; len],
        })
    }

    /// Field width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Field height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Read-only access to the underlying row-major data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Value at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        (x < self.width && y < self.height).then(|| self.data[y * self.width + x])
    }

    /// Sets `(x, y)` to `value` clamped to [0, 1]. Writes outside the grid are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value.clamp(0.0, 1.0);
        }
    }

    /// Fills the `size x size` block whose top-left corner is `(x, y)`,
    /// clipped to the grid.
    pub fn fill_block(&mut self, x: usize, y: usize, size: usize, value: f64) {
        let v = value.clamp(0.0, 1.0);
        let x_end = x.saturating_add(size).min(self.width);
        let y_end = y.saturating_add(size).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = row * self.width;
            self.data[start + x.min(x_end)..start + x_end].fill(v);
        }
    }

    /// Arithmetic mean of all cells.
    pub fn mean(&self) -> f64 {
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Iterates over all cells yielding `(x, y, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(|(i, &v)| (i % self.width, i / self.width, v))
    }
}
