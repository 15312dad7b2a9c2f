//! Card flip around the frame's centre line.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Mat4, Vec3};

use super::FlipAxis;
use crate::gpu::DrawContext;
use crate::world::frame::Frame;

pub(super) fn draw(
    from: &Frame,
    to: &Frame,
    progress: f32,
    axis: FlipAxis,
    ctx: &mut DrawContext<'_>,
) {
    // First half turns the old face edge-on, second half turns the new one back.
    let (frame, angle) = if progress <= 0.5 {
        (from, progress * PI)
    } else {
        (to, FRAC_PI_2 - (progress - 0.5) * PI)
    };
    let centre = frame.inner().center();
    let rotation = match axis {
        FlipAxis::Horizontal => Mat4::from_rotation_y(angle),
        FlipAxis::Vertical => Mat4::from_rotation_x(angle),
    };
    let pivot = Vec3::new(centre.x, centre.y, 0.0);
    let transform = ctx.base_transform()
        * Mat4::from_translation(pivot)
        * rotation
        * Mat4::from_translation(-pivot);
    if let Some(command) = frame.photo(frame.inner().vertices(), transform) {
        ctx.gpu.draw(command);
    }
}
