//! Fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use glam::Mat4;
use photophase::gpu::{DrawCommand, DrawContext, GpuContext};
use photophase::texture::{
    FrameId, ImageData, TextureDelivery, TextureHandle, TextureManager, TextureOutcome,
    TextureRequest,
};

/// Hands out sequential handles and records every draw.
#[derive(Debug, Default)]
pub struct RecordingGpu {
    next: u32,
    pub live: HashSet<TextureHandle>,
    pub deleted: Vec<TextureHandle>,
    pub commands: Vec<DrawCommand>,
}

impl GpuContext for RecordingGpu {
    fn upload(&mut self, _image: &ImageData) -> TextureHandle {
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

/// Records requests; the test decides what gets delivered and when.
#[derive(Debug, Default)]
pub struct ScriptedTextures {
    pub requests: Vec<TextureRequest>,
    pub cancelled: Vec<FrameId>,
    pub invalidations: Vec<bool>,
}

impl ScriptedTextures {
    /// Requestors that were neither cancelled nor answered yet, oldest first.
    pub fn outstanding(&self, answered: &[FrameId]) -> Vec<FrameId> {
        self.requests
            .iter()
            .map(|r| r.requestor)
            .filter(|id| !self.cancelled.contains(id) && !answered.contains(id))
            .collect()
    }

    pub fn last_requestor(&self) -> Option<FrameId> {
        self.requests.last().map(|r| r.requestor)
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

pub fn ready(requestor: FrameId, name: &str) -> TextureDelivery {
    TextureDelivery {
        requestor,
        outcome: TextureOutcome::Ready(ImageData {
            path: PathBuf::from(name),
            width: 2,
            height: 2,
            pixels: vec![255; 16],
        }),
    }
}

pub fn unavailable(requestor: FrameId) -> TextureDelivery {
    TextureDelivery {
        requestor,
        outcome: TextureOutcome::Unavailable,
    }
}

pub fn ctx(gpu: &mut RecordingGpu, now: Instant) -> DrawContext<'_> {
    DrawContext {
        gpu,
        view_projection: Mat4::IDENTITY,
        offset: 0.0,
        now,
        background: [0.0, 0.0, 0.0, 1.0],
        border: None,
    }
}
