use std::path::PathBuf;

use crate::texture::TextureDelivery;

/// Changes to the media library, from the files task to the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryEvent {
    PhotoAdded(PathBuf),
    PhotoRemoved(PathBuf),
}

/// Work marshalled onto the render thread.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    SurfaceChanged { width: u32, height: u32 },
    TextureReady(TextureDelivery),
    /// Window position in physical pixels.
    Touch { x: f32, y: f32 },
    Pause,
    Resume,
    /// Drop every image and rebuild the world from fresh media.
    ReloadMedia,
    LowMemory,
    Recycle,
}
