//! Stroke assembler: per-connection `Idle → Assembling → Idle` machine.
//!
//! DESIGN
//! ======
//! A connection's segments accumulate into one in-progress stroke between
//! `start` and `commit`. The assembler never touches history itself; `commit`
//! hands back the finished stroke and the coordinator decides what to do.
//!
//! A second `start` while assembling replaces the unfinished stroke. Clients
//! send exactly one start per gesture, so a repeated start means the previous
//! gesture was lost and its points must not reach history.

use crate::state::{Segment, Stroke};

/// What `start` did with any stroke already being assembled.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started,
    /// The unfinished stroke was discarded.
    Replaced(Stroke),
}

#[derive(Debug, Clone, Default)]
pub struct StrokeAssembler {
    in_progress: Option<Stroke>,
}

impl StrokeAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, color: impl Into<String>, line_width: f64) -> StartOutcome {
        match self.in_progress.replace(Stroke::new(color, line_width)) {
            Some(previous) => StartOutcome::Replaced(previous),
            None => StartOutcome::Started,
        }
    }

    /// Returns `false` when there is no stroke to append to.
    pub fn append_segment(&mut self, segment: Segment) -> bool {
        let Some(stroke) = self.in_progress.as_mut() else {
            return false;
        };
        stroke.points.push(segment);
        true
    }

    /// Finish the current stroke. Empty strokes are discarded; a second call
    /// with nothing in progress returns `None`.
    pub fn commit(&mut self) -> Option<Stroke> {
        self.in_progress
            .take()
            .filter(|stroke| !stroke.points.is_empty())
    }

    #[must_use]
    pub fn in_progress(&self) -> Option<&Stroke> {
        self.in_progress.as_ref()
    }
}

#[cfg(test)]
impl StrokeAssembler {
    pub fn is_assembling(&self) -> bool {
        self.in_progress.is_some()
    }
}
