#![forbid(unsafe_code)]

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use pdr_logic::{Cube, State};

use crate::options::TieBreak;
use crate::verdict::Trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObligationId(usize);

/// The transition linking an obligation's state to its parent's state
/// (or, for a root, to the bad state).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub inputs: Vec<bool>,
    pub successor: State,
}

/// "`state` must be shown unreachable within `frame` steps."
#[derive(Clone, Debug)]
pub struct Obligation {
    pub state: State,
    pub cube: Cube,
    pub frame: usize,
    /// Distance from the root obligation.
    pub depth: usize,
    pub parent: Option<ObligationId>,
    pub step: Step,
}

impl Obligation {
    pub fn root(state: State, frame: usize, step: Step) -> Self {
        Self {
            cube: state.to_cube(),
            state,
            frame,
            depth: 0,
            parent: None,
            step,
        }
    }

    pub fn predecessor(parent_id: ObligationId, parent: &Obligation, state: State, step: Step) -> Self {
        Self {
            cube: state.to_cube(),
            state,
            frame: parent.frame - 1,
            depth: parent.depth + 1,
            parent: Some(parent_id),
            step,
        }
    }
}

/// Obligations ordered by ascending frame.
///
/// Entries live in an arena until the queue is cleared, so parent links stay
/// valid for trace reconstruction after an obligation is popped.
#[derive(Debug)]
pub struct ObligationQueue {
    arena: Vec<Obligation>,
    heap: BinaryHeap<Reverse<(usize, u64, ObligationId)>>,
    seq: u64,
    tie_break: TieBreak,
}

impl ObligationQueue {
    pub fn new(tie_break: TieBreak) -> Self {
        Self {
            arena: Vec::new(),
            heap: BinaryHeap::new(),
            seq: 0,
            tie_break,
        }
    }

    fn schedule(&mut self, id: ObligationId) {
        self.seq += 1;
        let order = match self.tie_break {
            TieBreak::Fifo => self.seq,
            TieBreak::Lifo => u64::MAX - self.seq,
        };
        self.heap.push(Reverse((self.arena[id.0].frame, order, id)));
    }

    pub fn push(&mut self, obligation: Obligation) -> ObligationId {
        let id = ObligationId(self.arena.len());
        self.arena.push(obligation);
        self.schedule(id);
        id
    }

    /// Queue `id` again, after the predecessor it spawned.
    pub fn requeue(&mut self, id: ObligationId) {
        self.schedule(id);
    }

    /// Queue a copy of `id` at a later frame.
    pub fn reschedule(&mut self, id: ObligationId, frame: usize) -> ObligationId {
        let mut copy = self.arena[id.0].clone();
        copy.frame = frame;
        self.push(copy)
    }

    pub fn pop_min(&mut self) -> Option<ObligationId> {
        self.heap.pop().map(|Reverse((_, _, id))| id)
    }

    pub fn get(&self, id: ObligationId) -> &Obligation {
        &self.arena[id.0]
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Obligations held in the arena, popped or not.
    pub fn stored(&self) -> usize {
        self.arena.len()
    }

    /// Drop every obligation. Ids handed out earlier become invalid.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.arena.clear();
    }

    /// Concrete path from `leaf`'s state through its ancestors to the bad state.
    pub fn trace(&self, leaf: ObligationId) -> Trace {
        let mut node = self.get(leaf);
        let mut states = vec![node.state.clone()];
        let mut inputs = Vec::new();
        loop {
            states.push(node.step.successor.clone());
            inputs.push(node.step.inputs.clone());
            match node.parent {
                Some(p) => node = self.get(p),
                None => break,
            }
        }
        Trace { states, inputs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(bits: u64) -> State {
        State::from_bits(3, bits)
    }

    fn step(to: u64) -> Step {
        Step {
            inputs: vec![to % 2 == 1],
            successor: st(to),
        }
    }

    #[test]
    fn pops_lowest_frame_first() {
        let mut q = ObligationQueue::new(TieBreak::Fifo);
        let high = q.push(Obligation::root(st(1), 3, step(2)));
        let low = q.push(Obligation::root(st(2), 1, step(3)));
        let mid = q.push(Obligation::root(st(3), 2, step(4)));
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop_min(), Some(low));
        assert_eq!(q.pop_min(), Some(mid));
        assert_eq!(q.pop_min(), Some(high));
        assert!(q.is_empty());
    }

    #[test]
    fn tie_break_controls_equal_frames() {
        let mut fifo = ObligationQueue::new(TieBreak::Fifo);
        let a = fifo.push(Obligation::root(st(1), 2, step(0)));
        let b = fifo.push(Obligation::root(st(2), 2, step(0)));
        assert_eq!(fifo.pop_min(), Some(a));
        assert_eq!(fifo.pop_min(), Some(b));

        let mut lifo = ObligationQueue::new(TieBreak::Lifo);
        let a = lifo.push(Obligation::root(st(1), 2, step(0)));
        let b = lifo.push(Obligation::root(st(2), 2, step(0)));
        assert_eq!(lifo.pop_min(), Some(b));
        assert_eq!(lifo.pop_min(), Some(a));
    }

    #[test]
    fn predecessor_runs_before_requeued_parent() {
        let mut q = ObligationQueue::new(TieBreak::Fifo);
        let root = q.push(Obligation::root(st(4), 2, step(5)));
        assert_eq!(q.pop_min(), Some(root));
        let pred = Obligation::predecessor(root, q.get(root), st(3), step(4));
        assert_eq!((pred.frame, pred.depth), (1, 1));
        let pred = q.push(pred);
        q.requeue(root);
        assert_eq!(q.pop_min(), Some(pred));
        assert_eq!(q.pop_min(), Some(root));
    }

    #[test]
    fn trace_walks_parent_links_to_the_bad_state() {
        let mut q = ObligationQueue::new(TieBreak::Fifo);
        let root = q.push(Obligation::root(st(3), 3, step(4)));
        let mid = q.push(Obligation::predecessor(root, q.get(root), st(2), step(3)));
        let leaf = q.push(Obligation::predecessor(mid, q.get(mid), st(1), step(2)));

        let trace = q.trace(leaf);
        assert_eq!(trace.states, vec![st(1), st(2), st(3), st(4)]);
        assert_eq!(trace.inputs, vec![vec![false], vec![true], vec![false]]);
        assert_eq!(trace.depth(), 3);
    }

    #[test]
    fn rescheduled_copy_keeps_its_chain() {
        let mut q = ObligationQueue::new(TieBreak::Fifo);
        let root = q.push(Obligation::root(st(3), 1, step(4)));
        q.pop_min();
        let copy = q.reschedule(root, 2);
        assert_ne!(copy, root);
        assert_eq!(q.get(copy).frame, 2);
        assert_eq!(q.trace(copy), q.trace(root));
    }

    #[test]
    fn clear_releases_popped_obligations() {
        let mut q = ObligationQueue::new(TieBreak::Fifo);
        let root = q.push(Obligation::root(st(3), 2, step(4)));
        q.pop_min();
        q.push(Obligation::predecessor(root, q.get(root), st(2), step(3)));
        q.pop_min();
        assert!(q.is_empty());
        assert_eq!(q.stored(), 2);

        q.clear();
        assert_eq!(q.stored(), 0);
        let fresh = q.push(Obligation::root(st(1), 1, step(2)));
        assert_eq!(q.get(fresh).state, st(1));
        assert_eq!(q.stored(), 1);
    }
}
