//! Contract between cloud layers and whatever draws them.
//!
//! The simulation never touches pixels. A layer hands a [`Renderer`] a
//! sequence of state changes and [`SpriteDraw`] records; the backend decides
//! how a soft sprite actually looks.

use glam::DVec2;

use crate::canvas::BlendMode;
use crate::color::Srgb;

/// One soft, round cloud sprite to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw {
    /// Center in layer-local coordinates (before the layer's translations).
    pub position: DVec2,
    /// Radius of the soft falloff, in canvas units.
    pub radius: f64,
    /// Peak opacity at the center, in [0, 1].
    pub opacity: f64,
    pub color: Srgb,
}

/// A drawing surface driven by layer `display` calls.
///
/// `push`/`pop` save and restore the accumulated translation and blend mode;
/// translations compose additively until the matching `pop`.
pub trait Renderer {
    fn push(&mut self);
    fn pop(&mut self);
    fn translate(&mut self, offset: DVec2);
    fn set_blend_mode(&mut self, mode: BlendMode);
    fn draw_sprite(&mut self, sprite: &SpriteDraw);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every call so tests can assert on the exact sequence.
    #[derive(Debug, Default)]
    struct CallLog {
        calls: Vec<String>,
    }

    impl Renderer for CallLog {
        fn push(&mut self) {
            self.calls.push("push".into());
        }
        fn pop(&mut self) {
            self.calls.push("pop".into());
        }
        fn translate(&mut self, offset: DVec2) {
            self.calls.push(format!("translate({}, {})", offset.x, offset.y));
        }
        fn set_blend_mode(&mut self, mode: BlendMode) {
            self.calls.push(format!("blend({mode:?})"));
        }
        fn draw_sprite(&mut self, sprite: &SpriteDraw) {
            self.calls.push(format!("sprite({}, {})", sprite.position.x, sprite.position.y));
        }
    }

    #[test]
    fn renderer_is_object_safe() {
        let mut log = CallLog::default();
        let renderer: &mut dyn Renderer = &mut log;
        renderer.push();
        renderer.set_blend_mode(BlendMode::Additive);
        renderer.translate(DVec2::new(1.0, 2.0));
        renderer.draw_sprite(&SpriteDraw {
            position: DVec2::new(3.0, 4.0),
            radius: 5.0,
            opacity: 0.5,
            color: Srgb::WHITE,
        });
        renderer.pop();
        assert_eq!(
            log.calls,
            [
                "push",
                "blend(Additive)",
                "translate(1, 2)",
                "sprite(3, 4)",
                "pop"
            ]
        );
    }
}
