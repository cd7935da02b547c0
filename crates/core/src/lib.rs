//! Core traits and types for Hawser.
//!
//! This crate defines the shared abstractions that the stepping engine and
//! the mooring system build on:
//!
//! - [`PhysicalObject`]: an entity contributing degrees of freedom
//! - [`StateVector`]: the global state vector and its affine operations
//! - [`Dynamics`]: the stage-by-stage contract between an engine and the
//!   objects it advances
//! - [`StateLayout`]: index tables mapping objects onto the state vector
//! - [`Checkpoint`]: packing run-time state into 64-bit words
//! - [`Observer`]: receives driver events and optionally returns actions

pub mod checkpoint;
mod dynamics;
mod error;
pub mod layout;
mod object;
mod observer;
mod state;
mod step_size;

pub use checkpoint::{Checkpoint, WordReader};
pub use dynamics::Dynamics;
pub use error::Error;
pub use layout::{CoupledSlot, Slot, StateLayout};
pub use object::{ObjectKind, PhysicalObject, Role};
pub use observer::Observer;
pub use state::StateVector;
pub use step_size::{StepSize, StepSizeError};
