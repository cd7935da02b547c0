use hawser_core::StateVector;

/// Event emitted after each accepted step.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    /// The step number, starting at 1.
    pub step: usize,

    /// Simulation time after the step.
    pub time: f64,

    /// The newly accepted state.
    pub state: &'a StateVector,
}
