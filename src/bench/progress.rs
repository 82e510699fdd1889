//! Progress reporting from the testers
//!
//! Testers never draw anything themselves; they hand a [`ProgressUpdate`]
//! to a [`ProgressSink`] once per transfer and leave rendering to the caller.

/// Which part of a test is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SequentialWrite,
    SequentialRead,
    RandomIo,
    PatternWrite,
    PatternCompare,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::SequentialWrite => "Writing",
            Phase::SequentialRead => "Reading",
            Phase::RandomIo => "Seeking",
            Phase::PatternWrite => "Writing",
            Phase::PatternCompare => "Comparing",
        }
    }
}

/// Progress update sent after each transfer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub phase: Phase,
    /// 1-based index of the transfer just finished
    pub current: u64,
    /// Transfers in one pass of this phase
    pub total: u64,
    /// Erroneous blocks so far (pattern compare only)
    pub errors: u64,
}

impl ProgressUpdate {
    pub fn new(phase: Phase, current: u64, total: u64) -> Self {
        Self {
            phase,
            current,
            total,
            errors: 0,
        }
    }

    pub fn with_errors(mut self, errors: u64) -> Self {
        self.errors = errors;
        self
    }

    /// Calculate completion percentage (0.0 to 1.0)
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f64 / self.total as f64).min(1.0)
        }
    }
}

/// Receiver of progress from a running tester
pub trait ProgressSink {
    /// A phase with `total` transfers per pass is starting
    fn phase_started(&mut self, _label: &str, _phase: Phase, _total: u64) {}

    fn on_progress(&mut self, update: &ProgressUpdate);

    /// The phase ended
    fn phase_finished(&mut self, _phase: Phase) {}
}

impl<F: FnMut(&ProgressUpdate)> ProgressSink for F {
    fn on_progress(&mut self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&mut self, _update: &ProgressUpdate) {}
}
