use crate::gpu::{DrawCommand, DrawContext};
use crate::world::frame::Frame;

pub(super) fn draw(from: &Frame, to: &Frame, progress: f32, ctx: &mut DrawContext<'_>) {
    if progress >= 1.0 || !from.is_loaded() {
        to.draw(ctx);
        return;
    }
    ctx.gpu.draw(DrawCommand::Blend {
        from: from.texture_handle(),
        to: to.texture_handle(),
        vertices: to.inner().vertices(),
        transform: ctx.base_transform(),
        amount: progress,
    });
}
