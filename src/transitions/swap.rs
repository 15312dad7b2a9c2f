use crate::gpu::DrawContext;
use crate::world::frame::Frame;

pub(super) fn draw(next: &Frame, ctx: &mut DrawContext<'_>) {
    next.draw(ctx);
}
