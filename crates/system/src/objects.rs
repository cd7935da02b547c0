//! The physical objects of a mooring system.
//!
//! Lines hang between connections and rod ends. Connections and rods may in
//! turn be carried by bodies. Every object implements
//! [`hawser_core::PhysicalObject`], so the state layout can place the free
//! ones in the global state vector.

mod body;
mod connection;
mod line;
mod rod;

pub use body::{Body, BodyProps};
pub use connection::{Connection, ConnectionProps};
pub use line::{Line, LineProps};
pub use rod::{Rod, RodProps, RodRole};

use hawser_core::Error;
use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;

/// One of the two ends of a line or rod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum End {
    A,
    B,
}

/// A reference to one end of a line, held by whatever the end is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineEnd {
    /// Index of the line in the system.
    pub line: usize,
    pub end: End,
}

/// Reads a 3-vector from the front of `values`.
pub(crate) fn vector3(values: &[f64]) -> Vector3<f64> {
    Vector3::new(values[0], values[1], values[2])
}

/// Writes `v` to the front of `out`.
pub(crate) fn write3(out: &mut [f64], v: &Vector3<f64>) {
    out[..3].copy_from_slice(v.as_slice());
}

/// Checks the length of externally supplied kinematics.
pub(crate) fn require_dof(
    what: &str,
    id: usize,
    expected: usize,
    r: &[f64],
    rd: &[f64],
) -> Result<(), Error> {
    if r.len() != expected || rd.len() != expected {
        return Err(Error::invalid_input(format!(
            "{what} {id} takes {expected} coupled components, got {} positions and {} velocities",
            r.len(),
            rd.len()
        )));
    }
    Ok(())
}

/// Acceleration of a lumped mass, failing on a singular mass matrix.
pub(crate) fn accelerate(
    what: &str,
    id: usize,
    mass: &Matrix3<f64>,
    force: &Vector3<f64>,
) -> Result<Vector3<f64>, Error> {
    mass.try_inverse()
        .map(|inverse| inverse * force)
        .ok_or_else(|| Error::invalid_state(format!("{what} {id} has a singular mass matrix")))
}

/// Unit vector along `v`, or `None` for a zero vector.
pub(crate) fn unit(v: &Vector3<f64>) -> Option<Vector3<f64>> {
    v.try_normalize(f64::EPSILON)
}
