//! Mooring system dynamics for Hawser.
//!
//! A [`MooringSystem`] is built from a [`SystemConfig`] (usually parsed
//! from TOML) and then driven by a host simulation one coupling step at a
//! time:
//!
//! ```ignore
//! use hawser_system::MooringSystem;
//!
//! let mut system = MooringSystem::from_toml(&std::fs::read_to_string("mooring.toml")?)?;
//! system.init(&fairleads, &[0.0; 3], false)?;
//!
//! loop {
//!     let loads = system.step(&fairleads, &velocities, 0.05)?;
//!     // hand `loads` to the host...
//! }
//! ```
//!
//! The system is made of [`objects`]: lines discretized into lumped-mass
//! nodes, point connections, rigid rods and six-DOF bodies. Each of them is
//! free, coupled to the host, or fixed. Free objects own a slice of the
//! global state vector that the stepping engine in [`hawser_solvers`]
//! advances; coupled objects follow the host's kinematics and report their
//! loads back.

pub mod config;
mod env;
mod failure;
mod model;
pub mod objects;
mod system;
mod waves;

pub use config::{InitialConditions, SystemConfig};
pub use env::Env;
pub use failure::FailureCondition;
pub use objects::{Body, Connection, End, Line, LineEnd, Rod, RodRole};
pub use system::MooringSystem;
pub use waves::{WaveBuffer, WaveSample};
