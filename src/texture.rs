//! Image resources and the texture-acquisition boundary.
//!
//! Frames never decode anything themselves. They post a [`TextureRequest`]
//! to a [`TextureManager`] and later receive a [`TextureDelivery`] on the
//! render thread, which they turn into a GPU texture through
//! [`GpuContext`](crate::gpu::GpuContext).

use std::path::PathBuf;

use crate::gpu::GpuContext;

/// GPU texture name. Zero is reserved as the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

impl TextureHandle {
    pub const INVALID: Self = Self(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Identity of a texture requestor, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

impl FrameId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// A texture bound to a frame, together with the pixels it was built from.
#[derive(Debug)]
pub struct TextureInfo {
    handle: TextureHandle,
    image: Option<ImageData>,
}

impl TextureInfo {
    pub fn new(handle: TextureHandle, image: ImageData) -> Self {
        Self {
            handle,
            image: Some(image),
        }
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn image(&self) -> Option<&ImageData> {
        self.image.as_ref()
    }

    /// Deletes the GPU texture and drops the pixels. The handle is reset to
    /// the invalid sentinel before the pixel buffer goes away.
    pub fn release(&mut self, gpu: &mut dyn GpuContext) {
        let handle = std::mem::replace(&mut self.handle, TextureHandle::INVALID);
        if handle.is_valid() && gpu.is_texture(handle) {
            gpu.delete_texture(handle);
        }
        self.image = None;
    }
}

/// What a frame asks the texture manager for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRequest {
    pub requestor: FrameId,
    pub width: u32,
    pub height: u32,
    /// The frame is flagged for photo effects.
    pub effect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureOutcome {
    Ready(ImageData),
    /// The manager could not produce an image; the requestor retries.
    Unavailable,
}

/// Answer to a [`TextureRequest`], consumed on the render thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDelivery {
    pub requestor: FrameId,
    pub outcome: TextureOutcome,
}

/// Asynchronous image source used by the world.
pub trait TextureManager {
    fn request(&mut self, request: TextureRequest);

    fn cancel_request(&mut self, requestor: FrameId);

    /// Drops cached and in-flight images. With `immediate` the media pool is
    /// rebuilt from scratch as well.
    fn invalidate_all(&mut self, immediate: bool);
}
