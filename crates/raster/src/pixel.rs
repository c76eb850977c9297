//! Pure-computation pixel buffer conversion for scalar [`Field`]s.
//!
//! Always available (no feature gate) so callers without the `png` feature
//! can still inspect a noise field as RGBA bytes.

use cloudfield_core::color::Srgb;
use cloudfield_core::field::Field;

/// Maps each field value `t` in [0, 1] onto the gradient from `low` to `high`
/// and writes it as four bytes (R, G, B, 255). The buffer length is
/// `width * height * 4`.
pub fn field_to_rgba(field: &Field, low: Srgb, high: Srgb) -> Vec<u8> {
    field
        .data()
        .iter()
        .flat_map(|&t| {
            let [r, g, b] = low.lerp(high, t).to_rgb8();
            [r, g, b, 255u8]
        })
        .collect()
}

/// Black-to-white rendering of a field.
pub fn field_to_grayscale(field: &Field) -> Vec<u8> {
    field_to_rgba(field, Srgb::BLACK, Srgb::WHITE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_to_rgba_correct_length() {
        let field = Field::new(8, 4).unwrap();
        let buf = field_to_grayscale(&field);
        assert_eq!(buf.len(), 8 * 4 * 4);
    }

    #[test]
    fn field_to_rgba_alpha_always_255() {
        let mut field = Field::new(4, 4).unwrap();
        field.fill_block(0, 0, 4, 0.5);
        let buf = field_to_rgba(&field, Srgb::from_rgb8(10, 20, 30), Srgb::WHITE);
        for (i, &byte) in buf.iter().enumerate() {
            if i % 4 == 3 {
                assert_eq!(byte, 255, "alpha at pixel {} should be 255", i / 4);
            }
        }
    }

    #[test]
    fn field_to_rgba_boundary_colors() {
        let mut field = Field::new(2, 1).unwrap();
        field.set(1, 0, 1.0);
        let low = Srgb::from_rgb8(12, 34, 56);
        let high = Srgb::from_rgb8(200, 210, 220);
        let buf = field_to_rgba(&field, low, high);
        assert_eq!(&buf[..4], [12, 34, 56, 255]);
        assert_eq!(&buf[4..], [200, 210, 220, 255]);
    }

    #[test]
    fn grayscale_midpoint() {
        let mut field = Field::new(1, 1).unwrap();
        field.set(0, 0, 0.5);
        let buf = field_to_grayscale(&field);
        assert_eq!(buf, vec![128, 128, 128, 255]);
    }
}
