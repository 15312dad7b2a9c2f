//! The wallpaper world: frames laid out on a grid, one transition per frame
//! and the scheduler deciding which frame changes next.

pub mod disposition;
pub mod frame;
pub mod geometry;
pub mod scheduler;

use std::time::Instant;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::{debug, info, trace, warn};

use crate::gpu::{DrawContext, GpuContext};
use crate::texture::{FrameId, TextureDelivery, TextureManager};
use crate::transitions::{MAX_TRANSITION_TIME, Transition, TransitionKind};

use disposition::{DispositionFlags, DispositionTemplate};
use frame::{BindOutcome, Frame};
use geometry::{GridSize, Padding, geometry, screen_to_device};
use scheduler::{KindPolicy, TransitionPool, TransitionQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn of(width: u32, height: u32) -> Self {
        if height >= width {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }
}

/// Where frame placements come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutPolicy {
    Fixed {
        portrait: DispositionTemplate,
        landscape: DispositionTemplate,
    },
    /// A template is drawn at random on every rebuild.
    Random {
        portrait: Vec<DispositionTemplate>,
        landscape: Vec<DispositionTemplate>,
    },
}

/// Configuration snapshot consumed by the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldSettings {
    /// Grid in portrait orientation; landscape transposes it.
    pub grid: GridSize,
    pub layout: LayoutPolicy,
    pub kinds: KindPolicy,
    pub frame_spacer: bool,
}

impl WorldSettings {
    pub fn grid_for(&self, orientation: Orientation) -> GridSize {
        match orientation {
            Orientation::Portrait => self.grid,
            Orientation::Landscape => GridSize {
                cols: self.grid.rows,
                rows: self.grid.cols,
            },
        }
    }
}

#[derive(Debug)]
pub struct World {
    settings: WorldSettings,
    frames: Vec<Frame>,
    transitions: Vec<Transition>,
    pool: TransitionPool,
    queue: TransitionQueue,
    current: Option<usize>,
    selected_at: Option<Instant>,
    surface: (u32, u32),
    orientation: Orientation,
    grid: GridSize,
    template: DispositionTemplate,
    next_id: u64,
    recycled: bool,
    rng: StdRng,
}

impl World {
    pub fn new(settings: WorldSettings, rng: StdRng) -> Self {
        let grid = settings.grid;
        Self {
            settings,
            frames: Vec::new(),
            transitions: Vec::new(),
            pool: TransitionPool::default(),
            queue: TransitionQueue::default(),
            current: None,
            selected_at: None,
            surface: (0, 0),
            orientation: Orientation::Portrait,
            grid,
            template: DispositionTemplate::default(),
            next_id: 1,
            recycled: true,
            rng,
        }
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Applies at the next [`World::recreate_world`].
    pub fn set_settings(&mut self, settings: WorldSettings) {
        self.settings = settings;
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn queue(&self) -> &TransitionQueue {
        &self.queue
    }

    pub fn pool(&self) -> &TransitionPool {
        &self.pool
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn template(&self) -> &DispositionTemplate {
        &self.template
    }

    pub fn surface(&self) -> (u32, u32) {
        self.surface
    }

    pub fn is_recycled(&self) -> bool {
        self.recycled
    }

    fn allocate_id(&mut self) -> FrameId {
        let id = FrameId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn resolve_template(&mut self, grid: GridSize) -> DispositionTemplate {
        let candidate = match (&self.settings.layout, self.orientation) {
            (LayoutPolicy::Fixed { portrait, .. }, Orientation::Portrait) => Some(portrait.clone()),
            (LayoutPolicy::Fixed { landscape, .. }, Orientation::Landscape) => {
                Some(landscape.clone())
            }
            (LayoutPolicy::Random { portrait, .. }, Orientation::Portrait) => {
                portrait.choose(&mut self.rng).cloned()
            }
            (LayoutPolicy::Random { landscape, .. }, Orientation::Landscape) => {
                landscape.choose(&mut self.rng).cloned()
            }
        };
        match candidate {
            Some(template) => match template.validate(grid.cols, grid.rows) {
                Ok(()) => template,
                Err(err) => {
                    warn!(%err, template = %template, "unusable disposition; using a single frame");
                    DispositionTemplate::full(grid.cols, grid.rows)
                }
            },
            None => DispositionTemplate::full(grid.cols, grid.rows),
        }
    }

    /// Rebuilds every frame for a surface of `width` x `height` pixels.
    pub fn recreate_world(
        &mut self,
        width: u32,
        height: u32,
        gpu: &mut dyn GpuContext,
        textures: &mut dyn TextureManager,
    ) {
        self.recycle(gpu, textures);

        self.surface = (width, height);
        self.orientation = Orientation::of(width, height);
        self.grid = self.settings.grid_for(self.orientation);
        let grid = self.grid;
        self.template = self.resolve_template(grid);

        let padding = Padding::for_layout(
            self.settings.frame_spacer,
            self.template.len(),
            width,
            height,
        );
        let entries = self.template.entries().to_vec();
        for d in entries {
            let g = geometry(&d, grid, padding);
            let texture_size = (
                ((g.inner.width() * 0.5 * width as f32).round() as u32).max(1),
                ((g.inner.height() * 0.5 * height as f32).round() as u32).max(1),
            );
            let id = self.allocate_id();
            let frame = Frame::new(id, d, g, texture_size);
            if frame.has(DispositionFlags::BACKGROUND) {
                frame.request_texture(textures);
            }
            self.frames.push(frame);
            self.transitions.push(self.pool.obtain(TransitionKind::None));
        }

        let eligible = DispositionFlags::BACKGROUND | DispositionFlags::TRANSITION;
        self.queue = TransitionQueue::new(
            self.frames
                .iter()
                .enumerate()
                .filter(|(_, f)| f.has(eligible))
                .map(|(i, _)| i),
        );
        self.recycled = false;
        info!(
            width,
            height,
            orientation = ?self.orientation,
            cols = grid.cols,
            rows = grid.rows,
            frames = self.frames.len(),
            eligible = self.queue.pending().len(),
            template = %self.template,
            "world rebuilt"
        );
    }

    /// Steady frames first, then the animated one on top.
    pub fn draw(&mut self, ctx: &mut DrawContext<'_>) {
        let running: Vec<bool> = self.transitions.iter().map(Transition::is_running).collect();
        for pass in [false, true] {
            for (i, frame) in self.frames.iter().enumerate() {
                if running[i] != pass || !frame.has(DispositionFlags::BACKGROUND) {
                    continue;
                }
                frame.draw_border(ctx);
                self.transitions[i].apply(frame, ctx);
            }
        }
    }

    pub fn has_running_transition(&self) -> bool {
        self.transitions.iter().any(Transition::is_running)
    }

    /// Whether the committed transition has outlived [`MAX_TRANSITION_TIME`].
    pub fn is_transition_timed_out(&self, now: Instant) -> bool {
        self.selected_at
            .is_some_and(|at| now.saturating_duration_since(at) > MAX_TRANSITION_TIME)
    }

    /// Picks the next frame from the rotation and starts a transition on it.
    pub fn select_random_transition(
        &mut self,
        textures: &mut dyn TextureManager,
        now: Instant,
    ) -> Option<usize> {
        if self.current.is_some() {
            debug!("transition already committed; select ignored");
            return None;
        }
        let index = self.queue.pop_random(&mut self.rng)?;
        self.commit(index, textures, now);
        Some(index)
    }

    /// Starts a transition on a specific frame, e.g. after a tap.
    pub fn select_transition(
        &mut self,
        frame: FrameId,
        textures: &mut dyn TextureManager,
        now: Instant,
    ) -> bool {
        if self.current.is_some() {
            debug!(frame = %frame, "transition already committed; select ignored");
            return false;
        }
        let Some(index) = self.frames.iter().position(|f| f.id() == frame) else {
            return false;
        };
        if !self.queue.mark_used(index) {
            debug!(frame = %frame, "frame does not take part in transitions");
            return false;
        }
        self.commit(index, textures, now);
        true
    }

    fn commit(&mut self, index: usize, textures: &mut dyn TextureManager, now: Instant) {
        let next_id = self.allocate_id();
        let frame = &self.frames[index];

        let mut chosen = None;
        for kind in self.settings.kinds.candidates(&mut self.rng) {
            let candidate = self.pool.obtain(kind);
            if candidate.is_selectable(frame) {
                chosen = Some(candidate);
                break;
            }
            trace!(frame = %frame.id(), kind = %kind, "kind not selectable");
            self.pool.retire(candidate);
        }
        let mut transition = match chosen {
            Some(transition) => transition,
            None => {
                debug!(frame = %frame.id(), "no selectable kind; falling back to swap");
                self.pool.obtain(TransitionKind::Swap)
            }
        };

        transition.select(frame, next_id, textures, &mut self.rng);
        let idle = std::mem::replace(&mut self.transitions[index], transition);
        self.pool.retire(idle);
        self.current = Some(index);
        self.selected_at = Some(now);
    }

    /// Finishes the committed transition: installs the replacement frame if
    /// its image has arrived, otherwise abandons it and keeps the old frame.
    pub fn deselect_transition(
        &mut self,
        ctx: &mut DrawContext<'_>,
        textures: &mut dyn TextureManager,
    ) {
        let Some(index) = self.current.take() else {
            return;
        };
        let elapsed = self
            .selected_at
            .take()
            .map(|at| ctx.now.saturating_duration_since(at));
        let mut transition = std::mem::replace(
            &mut self.transitions[index],
            self.pool.obtain(TransitionKind::None),
        );

        match transition.take_transition_target() {
            Some(next) if next.is_loaded() => {
                let mut old = std::mem::replace(&mut self.frames[index], next);
                if !old.is_loaded() {
                    textures.cancel_request(old.id());
                }
                old.release(ctx.gpu);
                let frame = &self.frames[index];
                if frame.has(DispositionFlags::BACKGROUND) {
                    frame.draw_border(ctx);
                    self.transitions[index].apply(frame, ctx);
                }
                debug!(
                    old = %old.id(),
                    new = %frame.id(),
                    kind = %transition.kind(),
                    elapsed_ms = elapsed.map(|d| d.as_millis() as u64),
                    "transition finished"
                );
            }
            Some(mut next) => {
                textures.cancel_request(next.id());
                next.release(ctx.gpu);
                warn!(
                    frame = %self.frames[index].id(),
                    kind = %transition.kind(),
                    "replacement image never arrived; transition abandoned"
                );
            }
            None => {}
        }

        transition.reset();
        self.pool.retire(transition);
    }

    /// First frame whose photo area contains the window position `point`.
    pub fn frame_at(&self, point: Vec2) -> Option<&Frame> {
        let (width, height) = self.surface;
        let p = screen_to_device(point, width, height);
        self.frames.iter().find(|f| f.inner().contains(p))
    }

    /// Routes a texture delivery to the frame that asked for it.
    pub fn deliver_texture(
        &mut self,
        delivery: TextureDelivery,
        gpu: &mut dyn GpuContext,
        textures: &mut dyn TextureManager,
    ) -> BindOutcome {
        let TextureDelivery { requestor, outcome } = delivery;
        if let Some(frame) = self.frames.iter_mut().find(|f| f.id() == requestor) {
            return frame.bind_image(outcome, gpu, textures);
        }
        if let Some(frame) = self
            .transitions
            .iter_mut()
            .filter_map(Transition::transition_target_mut)
            .find(|f| f.id() == requestor)
        {
            return frame.bind_image(outcome, gpu, textures);
        }
        trace!(frame = %requestor, "stale texture delivery dropped");
        BindOutcome::Dropped
    }

    /// Releases every frame and transition. Idempotent.
    pub fn recycle(&mut self, gpu: &mut dyn GpuContext, textures: &mut dyn TextureManager) {
        if self.recycled {
            return;
        }
        for mut transition in self.transitions.drain(..) {
            if let Some(next) = transition.transition_target() {
                textures.cancel_request(next.id());
            }
            transition.recycle(gpu);
        }
        for mut transition in self.pool.drain() {
            transition.recycle(gpu);
        }
        for mut frame in self.frames.drain(..) {
            if !frame.is_loaded() {
                textures.cancel_request(frame.id());
            }
            frame.release(gpu);
        }
        self.queue.clear();
        self.current = None;
        self.selected_at = None;
        self.recycled = true;
        debug!("world recycled");
    }
}
