//! Render-thread drawing surface used by frames and transitions.

use std::time::Instant;

use glam::Mat4;

use crate::texture::{ImageData, TextureHandle};
use crate::world::geometry::Vertices;

/// RGBA colour with components in `[0, 1]`.
pub type Color = [f32; 4];

/// One textured or filled quad.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Photo {
        texture: TextureHandle,
        vertices: Vertices,
        transform: Mat4,
    },
    /// Linear mix from `from` to `to`, `amount` in `[0, 1]`.
    Blend {
        from: TextureHandle,
        to: TextureHandle,
        vertices: Vertices,
        transform: Mat4,
        amount: f32,
    },
    Fill {
        vertices: Vertices,
        transform: Mat4,
        color: Color,
    },
}

/// GPU operations the world needs. Implementations live on the render
/// thread; nothing here is required to be `Send`.
pub trait GpuContext {
    /// Uploads pixels, returning [`TextureHandle::INVALID`] on failure.
    fn upload(&mut self, image: &ImageData) -> TextureHandle;

    fn is_texture(&self, handle: TextureHandle) -> bool;

    fn delete_texture(&mut self, handle: TextureHandle);

    fn draw(&mut self, command: DrawCommand);
}

/// Per-frame drawing state passed down into transitions.
pub struct DrawContext<'a> {
    pub gpu: &'a mut dyn GpuContext,
    pub view_projection: Mat4,
    /// Horizontal scroll offset in device units.
    pub offset: f32,
    pub now: Instant,
    pub background: Color,
    pub border: Option<Color>,
}

impl DrawContext<'_> {
    /// View-projection with the scroll offset applied.
    pub fn base_transform(&self) -> Mat4 {
        self.view_projection * Mat4::from_translation(glam::Vec3::new(self.offset, 0.0, 0.0))
    }
}
