//! PhotoPhase: a tiled photo wallpaper whose frames swap pictures through
//! animated transitions.
//!
//! The [`world`] and [`transitions`] modules hold the engine and never
//! touch a GPU or a thread directly; they talk to the outside through
//! [`gpu::GpuContext`] and [`texture::TextureManager`]. The [`tasks`]
//! modules supply the windowed host, the image loader and the photo
//! library watcher.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod gpu;
pub mod processing {
    pub mod effects;
    pub mod fit;
}
pub mod renderer;
pub mod texture;
pub mod transitions;
pub mod world;
pub mod tasks {
    pub mod files;
    pub mod loader;
    pub mod viewer;
}

#[cfg(test)]
mod test_support;
