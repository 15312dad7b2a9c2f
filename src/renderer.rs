//! Drives the world from the host's render loop.
//!
//! The host calls [`WallpaperRenderer::handle`] for every queued command,
//! [`WallpaperRenderer::tick`] before drawing and
//! [`WallpaperRenderer::draw_frame`] once per presented frame, always from
//! the same thread. Time is passed in explicitly.

use std::time::{Duration, Instant};

use glam::{Mat4, Vec2};
use tracing::{debug, info, warn};

use crate::dispatch::{RenderMode, RenderThreadGuard};
use crate::events::RenderCommand;
use crate::gpu::{Color, DrawContext, GpuContext};
use crate::texture::TextureManager;
use crate::world::World;
use crate::world::frame::{BindOutcome, Frame};

/// Shortest gap between the end of one transition and the next.
pub const MIN_TRANSITION_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    /// Time between automatic transitions; zero shows static frames only.
    pub interval: Duration,
    pub touch_transition: bool,
    pub background: Color,
    pub border: Option<Color>,
    /// Rebuild with a fresh random layout this often; zero disables.
    pub relayout_interval: Duration,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            touch_transition: true,
            background: [0.125, 0.125, 0.125, 1.0],
            border: None,
            relayout_interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    pub mode: RenderMode,
    /// Earliest instant at which [`WallpaperRenderer::tick`] has work.
    pub wake_at: Option<Instant>,
}

#[derive(Debug)]
pub struct WallpaperRenderer<T> {
    world: World,
    textures: T,
    settings: RendererSettings,
    mode: RenderMode,
    paused: bool,
    dirty: bool,
    pending_touch: Option<Vec2>,
    last_transition: Option<Instant>,
    next_transition_at: Option<Instant>,
    next_relayout_at: Option<Instant>,
    guard: RenderThreadGuard,
}

impl<T: TextureManager> WallpaperRenderer<T> {
    pub fn new(world: World, textures: T, settings: RendererSettings) -> Self {
        Self {
            world,
            textures,
            settings,
            mode: RenderMode::WhenDirty,
            paused: false,
            dirty: true,
            pending_touch: None,
            last_transition: None,
            next_transition_at: None,
            next_relayout_at: None,
            guard: RenderThreadGuard::default(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn textures(&self) -> &T {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut T {
        &mut self.textures
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn next_transition_at(&self) -> Option<Instant> {
        self.next_transition_at
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty || self.mode == RenderMode::Continuously
    }

    pub fn handle(&mut self, command: RenderCommand, gpu: &mut dyn GpuContext, now: Instant) {
        self.guard.check();
        match command {
            RenderCommand::SurfaceChanged { width, height } => {
                self.rebuild(width, height, gpu, now);
            }
            RenderCommand::TextureReady(delivery) => {
                if self.world.deliver_texture(delivery, gpu, &mut self.textures)
                    == BindOutcome::Bound
                {
                    self.dirty = true;
                }
            }
            RenderCommand::Touch { x, y } => {
                if !self.settings.touch_transition {
                    return;
                }
                let point = Vec2::new(x, y);
                match self.world.frame_at(point) {
                    Some(frame) => {
                        debug!(frame = %frame.id(), x, y, "touch selects frame");
                        self.pending_touch = Some(point);
                        self.dirty = true;
                    }
                    None => debug!(x, y, "touch outside any frame"),
                }
            }
            RenderCommand::Pause => {
                info!("renderer paused");
                self.paused = true;
                self.next_transition_at = None;
            }
            RenderCommand::Resume => {
                info!("renderer resumed");
                self.paused = false;
                self.dirty = true;
            }
            RenderCommand::ReloadMedia => {
                info!("reloading media");
                self.textures.invalidate_all(true);
                let (width, height) = self.world.surface();
                if width > 0 && height > 0 {
                    self.rebuild(width, height, gpu, now);
                }
            }
            RenderCommand::LowMemory => {
                warn!("low memory; dropping cached textures");
                self.textures.invalidate_all(false);
            }
            RenderCommand::Recycle => {
                self.world.recycle(gpu, &mut self.textures);
                self.pending_touch = None;
                self.next_transition_at = None;
                self.next_relayout_at = None;
                self.mode = RenderMode::WhenDirty;
            }
        }
    }

    fn rebuild(&mut self, width: u32, height: u32, gpu: &mut dyn GpuContext, now: Instant) {
        self.world
            .recreate_world(width, height, gpu, &mut self.textures);
        self.pending_touch = None;
        self.mode = RenderMode::WhenDirty;
        self.dirty = true;
        self.next_relayout_at = (!self.settings.relayout_interval.is_zero())
            .then(|| now + self.settings.relayout_interval);
    }

    /// Runs timers that are due. Returns whether a redraw is needed.
    pub fn tick(&mut self, gpu: &mut dyn GpuContext, now: Instant) -> bool {
        self.guard.check();
        if self.paused {
            return self.needs_redraw();
        }

        if self.next_relayout_at.is_some_and(|at| at <= now) && self.world.current().is_none() {
            let (width, height) = self.world.surface();
            debug!("rebuilding with a new random layout");
            self.rebuild(width, height, gpu, now);
            return true;
        }

        if self.next_transition_at.is_some_and(|at| at <= now) && self.world.current().is_none()
        {
            self.next_transition_at = None;
            if let Some(index) = self
                .world
                .select_random_transition(&mut self.textures, now)
            {
                debug!(index, "scheduled transition started");
                self.last_transition = Some(now);
                self.mode = RenderMode::Continuously;
                return true;
            }
        }
        self.needs_redraw()
    }

    /// Draws the world and advances the transition state machine.
    pub fn draw_frame(&mut self, gpu: &mut dyn GpuContext, now: Instant) -> FrameOutcome {
        self.guard.check();
        let mut ctx = DrawContext {
            gpu,
            view_projection: Mat4::IDENTITY,
            offset: 0.0,
            now,
            background: self.settings.background,
            border: self.settings.border,
        };
        self.world.draw(&mut ctx);

        if self.paused {
            self.dirty = false;
            return FrameOutcome {
                mode: RenderMode::WhenDirty,
                wake_at: None,
            };
        }

        let timed_out = self.world.is_transition_timed_out(now);
        if timed_out {
            warn!("transition exceeded its time budget; moving on");
        }
        if !self.world.has_running_transition() || timed_out {
            self.mode = RenderMode::WhenDirty;
            self.world.deselect_transition(&mut ctx, &mut self.textures);

            // Resolved again here: the tapped frame may have just been replaced.
            let touched = self
                .pending_touch
                .take()
                .and_then(|point| self.world.frame_at(point).map(Frame::id));
            if let Some(frame) = touched {
                if self.world.select_transition(frame, &mut self.textures, now) {
                    self.last_transition = Some(now);
                    self.mode = RenderMode::Continuously;
                }
            }

            self.next_transition_at = None;
            if self.mode == RenderMode::WhenDirty && !self.settings.interval.is_zero()
            {
                let since = self
                    .last_transition
                    .map_or(self.settings.interval, |at| now.saturating_duration_since(at));
                let delay = self
                    .settings
                    .interval
                    .saturating_sub(since)
                    .max(MIN_TRANSITION_DELAY);
                self.next_transition_at = Some(now + delay);
            }
        }

        self.dirty = false;
        let wake_at = match (self.next_transition_at, self.next_relayout_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        FrameOutcome {
            mode: self.mode,
            wake_at,
        }
    }
}
