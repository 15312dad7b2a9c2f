//! Hand-off of work from other threads to the render thread.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crossbeam_channel::{Receiver, Sender, TryIter, unbounded};

use crate::events::RenderCommand;

/// Wakes the render loop after a command was queued.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Redraw as fast as the display allows.
    Continuously,
    /// Redraw only when something changed or a timer fires.
    WhenDirty,
}

/// Sending half, cloned freely across threads and tasks.
#[derive(Clone)]
pub struct RenderDispatcher {
    tx: Sender<RenderCommand>,
    waker: Option<Waker>,
}

impl fmt::Debug for RenderDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderDispatcher")
            .field("queued", &self.tx.len())
            .field("waker", &self.waker.is_some())
            .finish()
    }
}

impl RenderDispatcher {
    pub fn with_waker(mut self, waker: Waker) -> Self {
        self.waker = Some(waker);
        self
    }

    /// Queues `command`; returns `false` once the render thread is gone.
    pub fn send(&self, command: RenderCommand) -> bool {
        if self.tx.send(command).is_err() {
            return false;
        }
        if let Some(wake) = &self.waker {
            wake();
        }
        true
    }
}

/// Receiving half, owned by the render thread.
#[derive(Debug)]
pub struct RenderQueue {
    rx: Receiver<RenderCommand>,
}

impl RenderQueue {
    pub fn drain(&self) -> TryIter<'_, RenderCommand> {
        self.rx.try_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

pub fn render_channel() -> (RenderDispatcher, RenderQueue) {
    let (tx, rx) = unbounded();
    (RenderDispatcher { tx, waker: None }, RenderQueue { rx })
}

/// Remembers the first thread that touched render state and flags any other.
#[derive(Debug, Default)]
pub struct RenderThreadGuard {
    owner: Option<ThreadId>,
}

impl RenderThreadGuard {
    pub fn check(&mut self) {
        let current = thread::current().id();
        match self.owner {
            None => self.owner = Some(current),
            Some(owner) => debug_assert_eq!(owner, current, "render state used off its thread"),
        }
    }
}
