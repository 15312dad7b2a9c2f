//! Fair rotation over eligible frames and reuse of retired transitions.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::transitions::{Transition, TransitionKind};

/// Round-robin partition of eligible frame indices.
///
/// Every eligible index lives in exactly one of `pending` or `used`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionQueue {
    pending: Vec<usize>,
    used: Vec<usize>,
}

impl TransitionQueue {
    pub fn new(eligible: impl IntoIterator<Item = usize>) -> Self {
        Self {
            pending: eligible.into_iter().collect(),
            used: Vec::new(),
        }
    }

    pub fn pending(&self) -> &[usize] {
        &self.pending
    }

    pub fn used(&self) -> &[usize] {
        &self.used
    }

    pub fn contains(&self, index: usize) -> bool {
        self.pending.contains(&index) || self.used.contains(&index)
    }

    /// Starts a new cycle once every eligible frame has had its turn.
    pub fn ensure(&mut self) {
        if self.pending.is_empty() {
            self.pending.append(&mut self.used);
        }
    }

    /// Takes a uniformly random pending index and marks it used.
    pub fn pop_random(&mut self, rng: &mut impl Rng) -> Option<usize> {
        self.ensure();
        if self.pending.is_empty() {
            return None;
        }
        let slot = rng.random_range(0..self.pending.len());
        let index = self.pending.remove(slot);
        self.used.push(index);
        Some(index)
    }

    /// Moves `index` to the back of the used queue. Returns `false` for
    /// indices outside the eligible set.
    pub fn mark_used(&mut self, index: usize) -> bool {
        if let Some(pos) = self.pending.iter().position(|i| *i == index) {
            self.pending.remove(pos);
        } else if let Some(pos) = self.used.iter().position(|i| *i == index) {
            self.used.remove(pos);
        } else {
            return false;
        }
        self.used.push(index);
        true
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.used.clear();
    }
}

/// Free lists of retired transitions, one per kind.
#[derive(Debug)]
pub struct TransitionPool {
    free: [Vec<Transition>; TransitionKind::COUNT],
}

impl Default for TransitionPool {
    fn default() -> Self {
        Self {
            free: std::array::from_fn(|_| Vec::new()),
        }
    }
}

impl TransitionPool {
    /// A reset transition of `kind`, reused when one is available.
    pub fn obtain(&mut self, kind: TransitionKind) -> Transition {
        let mut transition = self.free[kind.index()]
            .pop()
            .unwrap_or_else(|| Transition::new(kind));
        transition.reset();
        transition
    }

    pub fn retire(&mut self, transition: Transition) {
        self.free[transition.kind().index()].push(transition);
    }

    pub fn len(&self) -> usize {
        self.free.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn available(&self, kind: TransitionKind) -> usize {
        self.free[kind.index()].len()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Transition> + '_ {
        self.free.iter_mut().flat_map(|list| list.drain(..))
    }
}

/// Which kinds the scheduler may pick from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KindPolicy {
    /// Any animated kind.
    #[default]
    Random,
    /// Only the listed kinds.
    Restricted(Vec<TransitionKind>),
}

impl KindPolicy {
    pub fn from_selected(kinds: &[TransitionKind]) -> Self {
        if kinds.is_empty() {
            Self::Random
        } else {
            let mut kinds = kinds.to_vec();
            kinds.sort();
            kinds.dedup();
            Self::Restricted(kinds)
        }
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Self::Random)
    }

    /// Candidate kinds in the order they should be tried.
    pub fn candidates(&self, rng: &mut impl Rng) -> Vec<TransitionKind> {
        let mut kinds = match self {
            Self::Random => TransitionKind::ANIMATED.to_vec(),
            Self::Restricted(kinds) => kinds.clone(),
        };
        kinds.shuffle(rng);
        kinds
    }
}
