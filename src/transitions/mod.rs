//! Timed effects that replace the photo shown by a frame.
//!
//! Every frame always carries a [`Transition`]; idle frames carry
//! [`TransitionKind::None`], which simply draws the frame. Animated kinds
//! own the frame that will replace their target until the world swaps it
//! in at deselect time.

mod cube;
mod fade;
mod flip;
mod mix;
mod swap;
mod translate;
mod window;

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Deserializer, de};
use tracing::debug;

use crate::gpu::{DrawContext, GpuContext};
use crate::texture::{FrameId, TextureManager};
use crate::world::frame::Frame;
use crate::world::geometry::Vertices;

/// Upper bound on how long the world waits for a committed transition.
pub const MAX_TRANSITION_TIME: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransitionKind {
    None,
    Swap,
    Fade,
    Mix,
    Translate,
    Flip,
    Window,
    Cube,
}

impl TransitionKind {
    pub const ALL: &'static [Self] = &[
        Self::None,
        Self::Swap,
        Self::Fade,
        Self::Mix,
        Self::Translate,
        Self::Flip,
        Self::Window,
        Self::Cube,
    ];
    /// Kinds that animate towards a new image.
    pub const ANIMATED: &'static [Self] = &[
        Self::Swap,
        Self::Fade,
        Self::Mix,
        Self::Translate,
        Self::Flip,
        Self::Window,
        Self::Cube,
    ];
    pub const COUNT: usize = Self::ALL.len();
    const NAMES: &'static [&'static str] = &[
        "none",
        "swap",
        "fade",
        "mix",
        "translate",
        "flip",
        "window",
        "cube",
    ];

    const CONFIG_NAMES: &'static [&'static str] =
        &["swap", "fade", "mix", "translate", "flip", "window", "cube"];

    pub const fn as_str(&self) -> &'static str {
        Self::NAMES[self.index()]
    }

    pub const fn index(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Swap => 1,
            Self::Fade => 2,
            Self::Mix => 3,
            Self::Translate => 4,
            Self::Flip => 5,
            Self::Window => 6,
            Self::Cube => 7,
        }
    }

    pub const fn duration(&self) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Swap => Duration::from_millis(250),
            Self::Fade | Self::Flip => Duration::from_millis(600),
            Self::Translate | Self::Window => Duration::from_millis(1200),
            Self::Cube => Duration::from_millis(1500),
            Self::Mix => Duration::from_millis(1800),
        }
    }

    pub const fn needs_new_image(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn is_selectable(&self, frame: &Frame) -> bool {
        let edges = frame.edges();
        match self {
            Self::Translate => edges.any(),
            Self::Window => edges.left || edges.right,
            _ => true,
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransitionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        for kind in Self::ANIMATED {
            if raw == kind.as_str() {
                return Ok(*kind);
            }
        }
        Err(de::Error::unknown_variant(&raw, Self::CONFIG_NAMES))
    }
}

/// Screen edge an animation moves towards or pivots on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// Per-run variation picked at select time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Static,
    Toward(Direction),
    Flip(FlipAxis),
}

impl Mode {
    fn pick(kind: TransitionKind, frame: &Frame, rng: &mut impl Rng) -> Self {
        let edges = frame.edges();
        let candidates: Vec<Direction> = match kind {
            TransitionKind::Translate => [
                (edges.left, Direction::Left),
                (edges.right, Direction::Right),
                (edges.top, Direction::Up),
                (edges.bottom, Direction::Down),
            ]
            .into_iter()
            .filter_map(|(ok, dir)| ok.then_some(dir))
            .collect(),
            TransitionKind::Window => [(edges.left, Direction::Left), (edges.right, Direction::Right)]
                .into_iter()
                .filter_map(|(ok, dir)| ok.then_some(dir))
                .collect(),
            TransitionKind::Cube => vec![Direction::Left, Direction::Right],
            TransitionKind::Flip => {
                let axis = if rng.random_bool(0.5) {
                    FlipAxis::Horizontal
                } else {
                    FlipAxis::Vertical
                };
                return Self::Flip(axis);
            }
            _ => return Self::Static,
        };
        candidates
            .choose(rng)
            .copied()
            .map_or(Self::Static, Self::Toward)
    }

    fn direction(&self) -> Direction {
        match self {
            Self::Toward(dir) => *dir,
            _ => Direction::Left,
        }
    }
}

/// Eased progress for `elapsed` out of `duration`, in `[0, 1]`.
pub fn progress(elapsed: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    let linear = (elapsed.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0);
    accelerate(linear)
}

/// Quadratic ease-in.
pub fn accelerate(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

fn pinch_left(mut v: Vertices, amount: f32) -> Vertices {
    v[0][1] += amount;
    v[2][1] -= amount;
    v
}

fn pinch_right(mut v: Vertices, amount: f32) -> Vertices {
    v[1][1] += amount;
    v[3][1] -= amount;
    v
}

#[derive(Debug)]
pub struct Transition {
    kind: TransitionKind,
    target: Option<FrameId>,
    transition_target: Option<Frame>,
    started_at: Option<Instant>,
    progress: f32,
    running: bool,
    mode: Mode,
}

impl Transition {
    pub fn new(kind: TransitionKind) -> Self {
        Self {
            kind,
            target: None,
            transition_target: None,
            started_at: None,
            progress: 0.0,
            running: false,
            mode: Mode::Static,
        }
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// The frame being transitioned away from.
    pub fn target(&self) -> Option<FrameId> {
        self.target
    }

    /// The frame that replaces the target once the animation completes.
    pub fn transition_target(&self) -> Option<&Frame> {
        self.transition_target.as_ref()
    }

    pub(crate) fn transition_target_mut(&mut self) -> Option<&mut Frame> {
        self.transition_target.as_mut()
    }

    pub(crate) fn take_transition_target(&mut self) -> Option<Frame> {
        self.transition_target.take()
    }

    pub fn is_selectable(&self, frame: &Frame) -> bool {
        self.kind.is_selectable(frame)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Clears per-run state. A pending replacement frame is left alone; it
    /// is handed over at deselect.
    pub fn reset(&mut self) {
        self.target = None;
        self.started_at = None;
        self.progress = 0.0;
        self.running = false;
        self.mode = Mode::Static;
    }

    /// Binds to `frame` and, for animated kinds, requests the replacement
    /// image for a new frame in the same slot.
    pub fn select(
        &mut self,
        frame: &Frame,
        next_id: FrameId,
        textures: &mut dyn TextureManager,
        rng: &mut impl Rng,
    ) {
        debug_assert!(self.transition_target.is_none());
        self.reset();
        self.target = Some(frame.id());
        if !self.kind.needs_new_image() {
            return;
        }
        let next = frame.sibling(next_id);
        next.request_texture(textures);
        self.transition_target = Some(next);
        self.mode = Mode::pick(self.kind, frame, rng);
        self.running = true;
        debug!(
            frame = %frame.id(),
            next = %next_id,
            kind = %self.kind,
            mode = ?self.mode,
            "transition selected"
        );
    }

    /// Draws the current animation step for `target`.
    pub fn apply(&mut self, target: &Frame, ctx: &mut DrawContext<'_>) {
        let next = match (&self.kind, self.transition_target.as_ref()) {
            (TransitionKind::None, _) | (_, None) => {
                target.draw(ctx);
                return;
            }
            (_, Some(next)) => next,
        };
        if !next.is_loaded() {
            // Keep showing the current photo until the replacement arrives.
            target.draw(ctx);
            return;
        }
        let started = *self.started_at.get_or_insert(ctx.now);
        let elapsed = ctx.now.saturating_duration_since(started);
        self.progress = progress(elapsed, self.kind.duration());
        let p = self.progress;
        match self.kind {
            TransitionKind::None => {}
            TransitionKind::Swap => swap::draw(next, ctx),
            TransitionKind::Fade => fade::draw(target, next, p, ctx),
            TransitionKind::Mix => mix::draw(target, next, p, ctx),
            TransitionKind::Translate => {
                translate::draw(target, next, p, self.mode.direction(), ctx)
            }
            TransitionKind::Flip => {
                let axis = match self.mode {
                    Mode::Flip(axis) => axis,
                    _ => FlipAxis::Horizontal,
                };
                flip::draw(target, next, p, axis, ctx)
            }
            TransitionKind::Window => window::draw(target, next, p, self.mode.direction(), ctx),
            TransitionKind::Cube => cube::draw(target, next, p, self.mode.direction(), ctx),
        }
        self.running = p < 1.0;
    }

    /// Permanent teardown.
    pub fn recycle(&mut self, gpu: &mut dyn GpuContext) {
        if let Some(mut next) = self.transition_target.take() {
            next.release(gpu);
        }
        self.reset();
    }
}
