//! Two faces of a cube turning about the vertical axis.

use std::f32::consts::PI;

use super::{Direction, pinch_left, pinch_right};
use crate::gpu::DrawContext;
use crate::world::frame::Frame;
use crate::world::geometry::Quad;

pub(super) fn draw(
    from: &Frame,
    to: &Frame,
    progress: f32,
    direction: Direction,
    ctx: &mut DrawContext<'_>,
) {
    if progress >= 1.0 {
        to.draw(ctx);
        return;
    }
    let quad = *from.inner();
    let depth = quad.width() * 0.2 / 2.0 * (progress * PI).sin();
    let transform = ctx.base_transform();

    // The fold travels across the frame; each face keeps its far edge on
    // the frame border and recedes there.
    let (old_face, new_face, old_vertices, new_vertices) = match direction {
        Direction::Right => {
            let fold = quad.left + quad.width() * progress;
            let new_face = Quad { right: fold, ..quad };
            let old_face = Quad { left: fold, ..quad };
            (
                old_face,
                new_face,
                pinch_right(old_face.vertices(), depth * progress),
                pinch_left(new_face.vertices(), depth * (1.0 - progress)),
            )
        }
        _ => {
            let fold = quad.right - quad.width() * progress;
            let old_face = Quad { right: fold, ..quad };
            let new_face = Quad { left: fold, ..quad };
            (
                old_face,
                new_face,
                pinch_left(old_face.vertices(), depth * progress),
                pinch_right(new_face.vertices(), depth * (1.0 - progress)),
            )
        }
    };
    if old_face.width() > 0.0 {
        if let Some(command) = from.photo(old_vertices, transform) {
            ctx.gpu.draw(command);
        }
    }
    if new_face.width() > 0.0 {
        if let Some(command) = to.photo(new_vertices, transform) {
            ctx.gpu.draw(command);
        }
    }
}
