/// Indicates how a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Completed all requested steps.
    Complete,

    /// Stopped early due to an observer action.
    StoppedByObserver,
}

/// The result of driving the engine for several steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    /// How the run terminated.
    pub status: Status,

    /// Number of steps taken.
    pub steps: usize,

    /// Simulation time at the end of the run.
    pub time: f64,
}
