//! The old photo swings open like a window sash hinged on a screen edge.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};

use super::{Direction, pinch_left, pinch_right};
use crate::gpu::DrawContext;
use crate::world::frame::Frame;

pub(super) fn draw(
    from: &Frame,
    to: &Frame,
    progress: f32,
    hinge: Direction,
    ctx: &mut DrawContext<'_>,
) {
    to.draw(ctx);
    if progress >= 1.0 {
        return;
    }
    let quad = from.inner();
    let amount = quad.width() * 0.2 / 2.0 * progress;
    let angle = progress * FRAC_PI_2;
    let (x, vertices, angle) = match hinge {
        Direction::Right => (quad.right, pinch_left(quad.vertices(), amount), angle),
        _ => (quad.left, pinch_right(quad.vertices(), amount), -angle),
    };
    let pivot = Vec3::new(x, 0.0, 0.0);
    let transform = ctx.base_transform()
        * Mat4::from_translation(pivot)
        * Mat4::from_rotation_y(angle)
        * Mat4::from_translation(-pivot);
    if let Some(command) = from.photo(vertices, transform) {
        ctx.gpu.draw(command);
    }
}
