//! In-crate fakes for the render-thread traits.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::gpu::{DrawCommand, GpuContext};
use crate::texture::{
    FrameId, ImageData, TextureHandle, TextureManager, TextureOutcome, TextureRequest,
};

#[derive(Debug, Default)]
pub struct RecordingGpu {
    next: u32,
    pub live: HashSet<TextureHandle>,
    pub deleted: Vec<TextureHandle>,
    pub commands: Vec<DrawCommand>,
    pub fail_uploads: bool,
}

impl GpuContext for RecordingGpu {
    fn upload(&mut self, _image: &ImageData) -> TextureHandle {
        if self.fail_uploads {
            return TextureHandle::INVALID;
        }
        self.next += 1;
        let handle = TextureHandle::new(self.next);
        self.live.insert(handle);
        handle
    }

    fn is_texture(&self, handle: TextureHandle) -> bool {
        self.live.contains(&handle)
    }

    fn delete_texture(&mut self, handle: TextureHandle) {
        assert!(self.live.remove(&handle), "double delete of {handle:?}");
        self.deleted.push(handle);
    }

    fn draw(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

#[derive(Debug, Default)]
pub struct ScriptedTextures {
    pub requests: Vec<TextureRequest>,
    pub cancelled: Vec<FrameId>,
    pub invalidations: Vec<bool>,
}

impl ScriptedTextures {
    pub fn pending(&self) -> Vec<FrameId> {
        self.requests
            .iter()
            .map(|r| r.requestor)
            .filter(|id| !self.cancelled.contains(id))
            .collect()
    }
}

impl TextureManager for ScriptedTextures {
    fn request(&mut self, request: TextureRequest) {
        self.requests.push(request);
    }

    fn cancel_request(&mut self, requestor: FrameId) {
        self.cancelled.push(requestor);
    }

    fn invalidate_all(&mut self, immediate: bool) {
        self.invalidations.push(immediate);
    }
}

pub fn image(name: &str) -> ImageData {
    ImageData {
        path: PathBuf::from(name),
        width: 1,
        height: 1,
        pixels: vec![0, 0, 0, 255],
    }
}

pub fn ready(name: &str) -> TextureOutcome {
    TextureOutcome::Ready(image(name))
}
