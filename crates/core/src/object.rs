use std::fmt;

use crate::Error;

/// How an object's state is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Integrated by the stepping engine; its state lives in the global vector.
    Free,

    /// Driven by the external caller every coupling step.
    Coupled,

    /// Held in place, or carried by a parent object.
    Fixed,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Free => "FREE",
            Role::Coupled => "COUPLED",
            Role::Fixed => "FIXED",
        };
        f.write_str(name)
    }
}

/// The categories of objects that contribute degrees of freedom.
///
/// The declaration order is the canonical order of the global state vector:
/// lines first, then connections, rods and bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Line,
    Connection,
    Rod,
    Body,
}

impl ObjectKind {
    /// All kinds, in global state vector order.
    pub const CANONICAL: [ObjectKind; 4] = [
        ObjectKind::Line,
        ObjectKind::Connection,
        ObjectKind::Rod,
        ObjectKind::Body,
    ];

    /// Position of this kind in [`ObjectKind::CANONICAL`].
    #[must_use]
    pub fn rank(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Line => "line",
            ObjectKind::Connection => "connection",
            ObjectKind::Rod => "rod",
            ObjectKind::Body => "body",
        };
        f.write_str(name)
    }
}

/// An entity that contributes degrees of freedom to a mooring system.
///
/// Free objects own a slice of the global state vector laid out as all
/// position components followed by all velocity components. The derivative
/// written by [`PhysicalObject::state_deriv`] uses the same layout: velocity
/// components followed by acceleration components.
///
/// Force accumulation is object specific and happens before `state_deriv` is
/// called; the derivative must depend only on the state last passed to
/// [`PhysicalObject::set_state`] and the forces gathered for it.
pub trait PhysicalObject {
    /// One-based identifier, as used in configuration files.
    fn id(&self) -> usize;

    fn kind(&self) -> ObjectKind;

    fn role(&self) -> Role;

    /// Number of global state vector components owned by this object.
    ///
    /// Zero for objects that are not integrated.
    fn state_len(&self) -> usize;

    /// Number of externally driven degrees of freedom.
    ///
    /// Zero for objects that are not coupled.
    fn coupled_dof(&self) -> usize;

    /// Writes the initial free state into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the object is not free or `out` has
    /// the wrong length.
    fn initial_state(&self, out: &mut [f64]) -> Result<(), Error>;

    /// Sets the object's kinematics from its slice of a stage buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the object is not free or `state`
    /// has the wrong length.
    fn set_state(&mut self, state: &[f64]) -> Result<(), Error>;

    /// Writes the state derivative implied by the current forces and mass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the object is not free or `out` has
    /// the wrong length, or [`Error::InvalidState`] if the mass matrix is
    /// singular.
    fn state_deriv(&self, out: &mut [f64]) -> Result<(), Error>;

    /// Fails unless the object owns state in the global vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the object and its role.
    fn require_free(&self, len: usize) -> Result<(), Error> {
        if self.state_len() == 0 {
            return Err(Error::invalid_input(format!(
                "{} {} is {} and has no free state",
                self.kind(),
                self.id(),
                self.role()
            )));
        }
        if len != self.state_len() {
            return Err(Error::invalid_input(format!(
                "{} {} expects {} state components, got {len}",
                self.kind(),
                self.id(),
                self.state_len()
            )));
        }
        Ok(())
    }
}
