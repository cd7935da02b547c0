use crate::{Error, StateVector};

/// The collection of objects a stepping engine advances.
///
/// A scheme evaluates the system at one or more stages per step. At every
/// stage it first calls [`Dynamics::update`] with the stage's state buffer
/// and then [`Dynamics::derivative`]; derivatives depend on the geometry
/// refreshed by `update`, so implementations may rely on that order.
///
/// `time` is always the absolute simulation time of the stage and `elapsed`
/// the time since the start of the current step, so coupled objects can
/// extrapolate their prescribed kinematics within the step.
pub trait Dynamics {
    /// Refreshes position-dependent quantities from a stage buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be applied to the objects.
    fn update(&mut self, time: f64, elapsed: f64, state: &StateVector) -> Result<(), Error>;

    /// Writes the derivative of the state last passed to [`Dynamics::update`].
    ///
    /// # Errors
    ///
    /// Returns an error if any derivative producer fails.
    fn derivative(&mut self, time: f64, out: &mut StateVector) -> Result<(), Error>;

    /// Finalizes the new accepted state after a successful step.
    ///
    /// This is called once per step, after every stage evaluation succeeded
    /// and before the engine commits the new state. It is the hook for
    /// discrete events that change the system's topology, such as a line end
    /// detaching from a failed connection and claiming a slice of `state`.
    ///
    /// The default implementation leaves the state unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if finalization fails; the step is then discarded.
    fn finalize_step(&mut self, _time: f64, _state: &mut StateVector) -> Result<(), Error> {
        Ok(())
    }
}
