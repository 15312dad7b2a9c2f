//! The old photo slides off screen over the new one.

use glam::{Mat4, Vec3};

use super::Direction;
use crate::gpu::DrawContext;
use crate::world::frame::Frame;

pub(super) fn draw(
    from: &Frame,
    to: &Frame,
    progress: f32,
    direction: Direction,
    ctx: &mut DrawContext<'_>,
) {
    to.draw(ctx);
    if progress >= 1.0 {
        return;
    }
    let quad = from.inner();
    let (dx, dy) = match direction {
        Direction::Left => (-quad.width() * progress, 0.0),
        Direction::Right => (quad.width() * progress, 0.0),
        Direction::Up => (0.0, quad.height() * progress),
        Direction::Down => (0.0, -quad.height() * progress),
    };
    let transform = ctx.base_transform() * Mat4::from_translation(Vec3::new(dx, dy, 0.0));
    if let Some(command) = from.photo(quad.vertices(), transform) {
        ctx.gpu.draw(command);
    }
}
