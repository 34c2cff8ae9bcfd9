//! History store: committed strokes plus a bounded redo stack.
//!
//! DESIGN
//! ======
//! History is append-only in normal operation; undo pops the tail onto the
//! redo stack and redo moves it back. Order is commit order, never
//! stroke-start order.
//!
//! The redo stack is a single linear timeline. Starting a new stroke clears
//! it, and so does committing one: with several connections drawing at once,
//! a stroke started before another user's undo can still commit after it, and
//! redo must not branch past that commit. When the stack is at capacity the
//! oldest undone stroke (the bottom) is evicted.

use std::collections::VecDeque;

use crate::state::Stroke;

/// Result of an undo or redo. `NoOp` means nothing changed and nothing
/// should be broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryChange {
    Changed(Vec<Stroke>),
    NoOp,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    strokes: Vec<Stroke>,
    /// Back of the deque is the top of the stack.
    redo: VecDeque<Stroke>,
    redo_depth: usize,
}

impl HistoryStore {
    #[must_use]
    pub fn new(redo_depth: usize) -> Self {
        Self {
            strokes: Vec::new(),
            redo: VecDeque::new(),
            redo_depth,
        }
    }

    /// Commit a new stroke. Anything left on the redo stack is dropped.
    pub fn append(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
        self.redo.clear();
    }

    pub fn undo(&mut self) -> HistoryChange {
        let Some(stroke) = self.strokes.pop() else {
            return HistoryChange::NoOp;
        };
        self.push_redo(stroke);
        HistoryChange::Changed(self.snapshot())
    }

    pub fn redo(&mut self) -> HistoryChange {
        let Some(stroke) = self.redo.pop_back() else {
            return HistoryChange::NoOp;
        };
        self.strokes.push(stroke);
        HistoryChange::Changed(self.snapshot())
    }

    /// Drop every undone stroke. Called when a new gesture begins.
    pub fn clear_redo(&mut self) {
        self.redo.clear();
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Stroke> {
        self.strokes.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    fn push_redo(&mut self, stroke: Stroke) {
        if self.redo_depth == 0 {
            return;
        }
        if self.redo.len() == self.redo_depth {
            self.redo.pop_front();
        }
        self.redo.push_back(stroke);
    }
}

#[cfg(test)]
impl HistoryStore {
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Undone strokes, bottom of the stack first.
    pub fn redo_stack(&self) -> impl Iterator<Item = &Stroke> {
        self.redo.iter()
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
