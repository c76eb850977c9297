#![deny(unsafe_code)]
//! CPU reference backend for the cloudfield [`Renderer`] contract.
//!
//! [`RasterCanvas`] accumulates linear RGB in `f64` so additive blending can
//! overshoot before the final quantization in [`RasterCanvas::to_rgba8`].
//! Sprites are soft radial gradients with no hard edge.

pub mod pixel;

#[cfg(feature = "png")]
pub mod snapshot;

use cloudfield_core::canvas::{BlendMode, CanvasSize};
use cloudfield_core::color::Srgb;
use cloudfield_core::error::CloudError;
use cloudfield_core::render::{Renderer, SpriteDraw};
use glam::{DVec2, DVec3};

/// Exponent applied after the smoothstep falloff to soften sprite edges.
const EDGE_SOFTNESS: f64 = 1.5;

fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Sprite alpha at normalized distance `d` from its center (1.0 = rim).
pub fn sprite_alpha(d: f64, opacity: f64) -> f64 {
    if d >= 1.0 {
        return 0.0;
    }
    (1.0 - smoothstep(0.0, 1.0, d)).powf(EDGE_SOFTNESS) * opacity
}

fn to_vec(c: Srgb) -> DVec3 {
    DVec3::new(c.r, c.g, c.b)
}

#[derive(Debug, Clone, Copy, Default)]
struct DrawState {
    offset: DVec2,
    blend: BlendMode,
}

/// An RGB pixel buffer driven through the [`Renderer`] trait.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    width: usize,
    height: usize,
    background: Srgb,
    pixels: Vec<DVec3>,
    state: DrawState,
    saved: Vec<DrawState>,
}

impl RasterCanvas {
    /// A canvas covering `canvas` (rounded up to whole pixels), filled with
    /// `background`.
    pub fn new(canvas: CanvasSize, background: Srgb) -> Result<Self, CloudError> {
        let (width, height) = canvas.pixels();
        let len = width
            .checked_mul(height)
            .ok_or(CloudError::InvalidDimensions)?;
        Ok(Self {
            width,
            height,
            background,
            pixels: vec![to_vec(background); len],
            state: DrawState::default(),
            saved: Vec::new(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Accumulated color at `(x, y)`; channels may exceed 1.0 after additive draws.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Srgb> {
        (x < self.width && y < self.height).then(|| {
            let p = self.pixels[y * self.width + x];
            Srgb {
                r: p.x,
                g: p.y,
                b: p.z,
            }
        })
    }

    /// Refills with the background and drops any saved draw state.
    pub fn clear(&mut self) {
        self.pixels.fill(to_vec(self.background));
        self.state = DrawState::default();
        self.saved.clear();
    }

    /// Current translation, for inspection.
    pub fn offset(&self) -> DVec2 {
        self.state.offset
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.state.blend
    }

    /// Quantizes to RGBA8, clamping each channel. Alpha is always 255.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| {
                let [r, g, b] = Srgb {
                    r: p.x,
                    g: p.y,
                    b: p.z,
                }
                .to_rgb8();
                [r, g, b, 255u8]
            })
            .collect()
    }

    /// Pixel index range `[lo, hi)` covering `center +/- radius` on one axis.
    fn span(center: f64, radius: f64, extent: usize) -> (usize, usize) {
        let lo = (center - radius).floor().max(0.0);
        let hi = (center + radius).ceil().min(extent as f64);
        if hi <= lo {
            (0, 0)
        } else {
            (lo as usize, hi as usize)
        }
    }
}

impl Renderer for RasterCanvas {
    fn push(&mut self) {
        self.saved.push(self.state);
    }

    /// Unbalanced pops are ignored.
    fn pop(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, offset: DVec2) {
        self.state.offset += offset;
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state.blend = mode;
    }

    fn draw_sprite(&mut self, sprite: &SpriteDraw) {
        let radius = sprite.radius;
        let opacity = sprite.opacity.clamp(0.0, 1.0);
        if !(radius.is_finite() && radius > 0.0) || opacity == 0.0 {
            return;
        }
        let center = sprite.position + self.state.offset;
        if !center.is_finite() {
            return;
        }
        let color = to_vec(sprite.color);
        let (x0, x1) = Self::span(center.x, radius, self.width);
        let (y0, y1) = Self::span(center.y, radius, self.height);

        for y in y0..y1 {
            let row = y * self.width;
            for x in x0..x1 {
                let pixel_center = DVec2::new(x as f64 + 0.5, y as f64 + 0.5);
                let alpha = sprite_alpha(pixel_center.distance(center) / radius, opacity);
                if alpha <= 0.0 {
                    continue;
                }
                let p = &mut self.pixels[row + x];
                *p = match self.state.blend {
                    BlendMode::Additive => *p + color * alpha,
                    BlendMode::Normal => p.lerp(color, alpha),
                };
            }
        }
    }
}
