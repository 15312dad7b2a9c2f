use glam::Mat4;
use tracing::{debug, trace};

use crate::gpu::{DrawCommand, DrawContext, GpuContext};
use crate::texture::{
    FrameId, TextureHandle, TextureInfo, TextureManager, TextureOutcome, TextureRequest,
};

use super::disposition::{Disposition, DispositionFlags};
use super::geometry::{Edges, FrameGeometry, Quad, Vertices};

/// Result of handing a delivery to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    /// The image was unusable and a new one has been requested.
    Retried,
    /// The frame was already released; the delivery was discarded.
    Dropped,
}

/// One cell of the wallpaper grid.
#[derive(Debug)]
pub struct Frame {
    id: FrameId,
    disposition: Disposition,
    geometry: FrameGeometry,
    texture_size: (u32, u32),
    texture: Option<TextureInfo>,
    loaded: bool,
    released: bool,
}

impl Frame {
    pub fn new(
        id: FrameId,
        disposition: Disposition,
        geometry: FrameGeometry,
        texture_size: (u32, u32),
    ) -> Self {
        Self {
            id,
            disposition,
            geometry,
            texture_size,
            texture: None,
            loaded: false,
            released: false,
        }
    }

    /// A fresh frame occupying the same slot, used as a transition target.
    pub fn sibling(&self, id: FrameId) -> Self {
        Self::new(id, self.disposition, self.geometry, self.texture_size)
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn disposition(&self) -> &Disposition {
        &self.disposition
    }

    pub fn has(&self, flags: DispositionFlags) -> bool {
        self.disposition.has(flags)
    }

    pub fn outer(&self) -> &Quad {
        &self.geometry.outer
    }

    pub fn inner(&self) -> &Quad {
        &self.geometry.inner
    }

    pub fn edges(&self) -> Edges {
        self.geometry.edges
    }

    pub fn texture_size(&self) -> (u32, u32) {
        self.texture_size
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn texture_handle(&self) -> TextureHandle {
        self.texture
            .as_ref()
            .map_or(TextureHandle::INVALID, TextureInfo::handle)
    }

    pub fn texture(&self) -> Option<&TextureInfo> {
        self.texture.as_ref()
    }

    pub fn request_texture(&self, textures: &mut dyn TextureManager) {
        let (width, height) = self.texture_size;
        trace!(frame = %self.id, width, height, "requesting texture");
        textures.request(TextureRequest {
            requestor: self.id,
            width,
            height,
            effect: self.has(DispositionFlags::EFFECT),
        });
    }

    /// Binds a delivered image. Unusable deliveries trigger a new request
    /// rather than leaving the frame with a broken texture.
    pub fn bind_image(
        &mut self,
        outcome: TextureOutcome,
        gpu: &mut dyn GpuContext,
        textures: &mut dyn TextureManager,
    ) -> BindOutcome {
        if self.released {
            debug!(frame = %self.id, "delivery for released frame dropped");
            return BindOutcome::Dropped;
        }
        let image = match outcome {
            TextureOutcome::Ready(image) => image,
            TextureOutcome::Unavailable => {
                debug!(frame = %self.id, "texture unavailable; retrying");
                self.request_texture(textures);
                return BindOutcome::Retried;
            }
        };
        let handle = gpu.upload(&image);
        if !handle.is_valid() {
            debug!(frame = %self.id, path = %image.path.display(), "upload failed; retrying");
            self.request_texture(textures);
            return BindOutcome::Retried;
        }
        if let Some(mut previous) = self.texture.take() {
            previous.release(gpu);
        }
        trace!(frame = %self.id, texture = handle.raw(), "texture bound");
        self.texture = Some(TextureInfo::new(handle, image));
        self.loaded = true;
        BindOutcome::Bound
    }

    /// Frees the bound texture. Safe to call repeatedly.
    pub fn release(&mut self, gpu: &mut dyn GpuContext) {
        if let Some(mut texture) = self.texture.take() {
            texture.release(gpu);
        }
        self.loaded = false;
        self.released = true;
    }

    /// Photo command over arbitrary vertices, if a texture is bound.
    pub fn photo(&self, vertices: Vertices, transform: Mat4) -> Option<DrawCommand> {
        let texture = self.texture_handle();
        (self.loaded && texture.is_valid()).then_some(DrawCommand::Photo {
            texture,
            vertices,
            transform,
        })
    }

    pub fn draw(&self, ctx: &mut DrawContext<'_>) {
        if let Some(command) = self.photo(self.inner().vertices(), ctx.base_transform()) {
            ctx.gpu.draw(command);
        }
    }

    pub fn draw_border(&self, ctx: &mut DrawContext<'_>) {
        let Some(color) = ctx.border else {
            return;
        };
        if self.has(DispositionFlags::BORDER) {
            ctx.gpu.draw(DrawCommand::Fill {
                vertices: self.outer().vertices(),
                transform: ctx.base_transform(),
                color,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::test_support::{RecordingGpu, ScriptedTextures, ready};
    use crate::world::geometry::{GridSize, geometry};

    fn frame(flags: DispositionFlags) -> Frame {
        let d = Disposition::new(0, 0, 1, 1).with_flags(flags);
        let g = geometry(&d, GridSize { cols: 2, rows: 2 }, None);
        Frame::new(FrameId::new(1), d, g, (64, 48))
    }

    fn ctx(gpu: &mut RecordingGpu, border: Option<[f32; 4]>) -> DrawContext<'_> {
        DrawContext {
            gpu,
            view_projection: Mat4::IDENTITY,
            offset: 0.0,
            now: Instant::now(),
            background: [0.0; 4],
            border,
        }
    }

    #[test]
    fn request_uses_the_photo_area_size() {
        let mut textures = ScriptedTextures::default();
        frame(DispositionFlags::ALL).request_texture(&mut textures);
        assert_eq!(textures.requests.len(), 1);
        assert_eq!(
            (textures.requests[0].width, textures.requests[0].height),
            (64, 48)
        );
        assert!(textures.requests[0].effect);
    }

    #[test]
    fn effects_are_requested_only_for_flagged_frames() {
        let mut textures = ScriptedTextures::default();
        frame(DispositionFlags::BACKGROUND.union(DispositionFlags::TRANSITION))
            .request_texture(&mut textures);
        assert!(!textures.requests[0].effect);
    }

    #[test]
    fn rebinding_frees_the_previous_texture() {
        let mut gpu = RecordingGpu::default();
        let mut textures = ScriptedTextures::default();
        let mut f = frame(DispositionFlags::ALL);

        assert_eq!(f.bind_image(ready("a.jpg"), &mut gpu, &mut textures), BindOutcome::Bound);
        let first = f.texture_handle();
        assert_eq!(f.bind_image(ready("b.jpg"), &mut gpu, &mut textures), BindOutcome::Bound);

        assert_eq!(gpu.deleted, vec![first]);
        assert_eq!(gpu.live.len(), 1);
        assert!(f.is_loaded());
    }

    #[test]
    fn failed_upload_requests_again() {
        let mut gpu = RecordingGpu::default();
        gpu.fail_uploads = true;
        let mut textures = ScriptedTextures::default();
        let mut f = frame(DispositionFlags::ALL);

        assert_eq!(f.bind_image(ready("a.jpg"), &mut gpu, &mut textures), BindOutcome::Retried);
        assert!(!f.is_loaded());
        assert_eq!(textures.pending(), vec![FrameId::new(1)]);
    }

    #[test]
    fn released_frame_drops_late_deliveries() {
        let mut gpu = RecordingGpu::default();
        let mut textures = ScriptedTextures::default();
        let mut f = frame(DispositionFlags::ALL);
        f.bind_image(ready("a.jpg"), &mut gpu, &mut textures);

        f.release(&mut gpu);
        f.release(&mut gpu);
        assert!(f.is_released());
        assert!(gpu.live.is_empty());
        assert_eq!(f.bind_image(ready("b.jpg"), &mut gpu, &mut textures), BindOutcome::Dropped);
        assert!(gpu.live.is_empty());
    }

    #[test]
    fn border_needs_colour_and_flag() {
        let mut gpu = RecordingGpu::default();
        frame(DispositionFlags::ALL).draw_border(&mut ctx(&mut gpu, None));
        frame(DispositionFlags::BACKGROUND).draw_border(&mut ctx(&mut gpu, Some([1.0; 4])));
        assert!(gpu.commands.is_empty());

        frame(DispositionFlags::ALL).draw_border(&mut ctx(&mut gpu, Some([1.0; 4])));
        assert!(matches!(gpu.commands[..], [DrawCommand::Fill { .. }]));
    }

    #[test]
    fn unloaded_frame_draws_nothing() {
        let mut gpu = RecordingGpu::default();
        frame(DispositionFlags::ALL).draw(&mut ctx(&mut gpu, None));
        assert!(gpu.commands.is_empty());
    }
}
