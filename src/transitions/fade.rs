//! Fade through the background colour.

use crate::gpu::{DrawCommand, DrawContext};
use crate::world::frame::Frame;

pub(super) fn draw(from: &Frame, to: &Frame, progress: f32, ctx: &mut DrawContext<'_>) {
    let (frame, alpha) = if progress <= 0.5 {
        (from, progress * 2.0)
    } else {
        (to, (1.0 - progress) * 2.0)
    };
    let transform = ctx.base_transform();
    let vertices = frame.inner().vertices();
    if let Some(command) = frame.photo(vertices, transform) {
        ctx.gpu.draw(command);
    }
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha > 0.0 {
        let [r, g, b, _] = ctx.background;
        ctx.gpu.draw(DrawCommand::Fill {
            vertices,
            transform,
            color: [r, g, b, alpha],
        });
    }
}
