//! PNG output for rendered canvases and scalar fields.
//!
//! Feature-gated behind `png` (default on) so the raster backend can be used
//! without pulling in the `image` crate.

use cloudfield_core::error::CloudError;
use cloudfield_core::field::Field;
use std::path::Path;

use crate::pixel::field_to_grayscale;
use crate::RasterCanvas;

fn write_rgba(width: usize, height: usize, rgba: Vec<u8>, path: &Path) -> Result<(), CloudError> {
    let w = u32::try_from(width).map_err(|_| CloudError::InvalidDimensions)?;
    let h = u32::try_from(height).map_err(|_| CloudError::InvalidDimensions)?;
    let img = image::RgbaImage::from_raw(w, h, rgba)
        .ok_or_else(|| CloudError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| CloudError::Io(e.to_string()))
}

/// Writes a rendered canvas as a PNG image.
///
/// Returns `CloudError::InvalidDimensions` if the canvas dimensions overflow
/// `u32`, or `CloudError::Io` on write failure.
pub fn write_png(canvas: &RasterCanvas, path: &Path) -> Result<(), CloudError> {
    write_rgba(canvas.width(), canvas.height(), canvas.to_rgba8(), path)
}

/// Writes a scalar field as a grayscale PNG image.
pub fn write_field_png(field: &Field, path: &Path) -> Result<(), CloudError> {
    write_rgba(field.width(), field.height(), field_to_grayscale(field), path)
}
