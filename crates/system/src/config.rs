//! System description, loaded from TOML.
//!
//! Objects refer to each other by 1-based ids, numbered in order within
//! each list. A minimal system hanging one line from a coupled fairlead to
//! an anchor:
//!
//! ```toml
//! scheme = "rk4"
//! dt_m = "0.001 s"
//!
//! [[connections]]
//! id = 1
//! role = "fixed"
//! position = [-400.0, 0.0, -200.0]
//!
//! [[connections]]
//! id = 2
//! role = "coupled"
//! position = [-20.0, 0.0, -14.0]
//!
//! [[lines]]
//! id = 1
//! segments = 20
//! length = 420.0
//! diameter = 0.09
//! mass_per_length = 77.7
//! ea = 3.8e8
//! end_a = { connection = 1 }
//! end_b = { connection = 2 }
//! ```

use std::str::FromStr;

use hawser_core::{Error, Role};
use hawser_solvers::transient::Scheme;
use serde::{Deserialize, Deserializer};
use uom::si::{f64::Time, time::second};

use crate::{
    env::Env,
    objects::{End, RodRole},
};

/// Everything needed to build a [`crate::MooringSystem`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemConfig {
    /// Stepping scheme name, such as `"rk4"` or `"beuler10"`.
    #[serde(default = "default_scheme")]
    pub scheme: Scheme,

    /// Largest internal time step.
    #[serde(deserialize_with = "deserialize_time")]
    pub dt_m: Time,

    #[serde(default)]
    pub env: Env,

    /// Settling run before the simulation starts.
    #[serde(default)]
    pub initial_conditions: InitialConditions,

    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,

    #[serde(default)]
    pub lines: Vec<LineConfig>,

    #[serde(default)]
    pub rods: Vec<RodConfig>,

    #[serde(default)]
    pub bodies: Vec<BodyConfig>,

    #[serde(default)]
    pub failures: Vec<FailureConfig>,
}

fn default_scheme() -> Scheme {
    Scheme::Rk2
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<Time, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<Time>()
        .map_err(|e| serde::de::Error::custom(format!("Failed to parse time: {e:?}")))
}

impl FromStr for SystemConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(|err| Error::invalid_configuration(err.to_string()))
    }
}

/// Dynamic relaxation settings for [`crate::MooringSystem::init`].
///
/// The free objects are integrated with every drag force multiplied by
/// `drag_factor` and the coupled objects held still. Every `dt` the line end
/// tensions are compared with the previous check; the run stops once none
/// changed by more than `threshold` of its value, or after `max_time`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialConditions {
    pub drag_factor: f64,

    /// Interval between convergence checks.
    #[serde(deserialize_with = "deserialize_time")]
    pub dt: Time,

    #[serde(deserialize_with = "deserialize_time")]
    pub max_time: Time,

    /// Largest relative tension change still counted as settled.
    pub threshold: f64,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            drag_factor: 5.0,
            dt: Time::new::<second>(1.0),
            max_time: Time::new::<second>(120.0),
            threshold: 0.001,
        }
    }
}

impl InitialConditions {
    /// Checks that the settling run is well defined.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for a non-positive drag factor,
    /// check interval or threshold, or a negative time limit.
    pub fn validate(&self) -> Result<(), Error> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        let max_time = self.max_time.get::<second>();
        if !positive(self.drag_factor) {
            return Err(Error::invalid_configuration(format!(
                "settling drag factor must be positive, got {}",
                self.drag_factor
            )));
        }
        if !positive(self.dt.get::<second>()) || !(max_time.is_finite() && max_time >= 0.0) {
            return Err(Error::invalid_configuration(
                "settling needs a positive check interval and a finite time limit",
            ));
        }
        if !positive(self.threshold) {
            return Err(Error::invalid_configuration(format!(
                "settling threshold must be positive, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Role of a connection or body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectRole {
    Free,
    Coupled,
    Fixed,
}

impl From<ObjectRole> for Role {
    fn from(role: ObjectRole) -> Self {
        match role {
            ObjectRole::Free => Role::Free,
            ObjectRole::Coupled => Role::Coupled,
            ObjectRole::Fixed => Role::Fixed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub id: usize,
    pub role: ObjectRole,

    /// World position, or the body-frame offset when carried by a body.
    pub position: [f64; 3],

    #[serde(default)]
    pub mass: f64,

    #[serde(default)]
    pub volume: f64,

    #[serde(default)]
    pub force: [f64; 3],

    #[serde(default)]
    pub cda: f64,

    #[serde(default)]
    pub ca: f64,

    /// Id of the carrying body. Carried connections must be fixed.
    #[serde(default)]
    pub body: Option<usize>,
}

/// What a line end hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Attachment {
    Connection { connection: usize },
    Rod { rod: usize, end: End },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineConfig {
    pub id: usize,
    pub segments: usize,

    /// Unstretched length, m.
    pub length: f64,

    pub diameter: f64,
    pub mass_per_length: f64,
    pub ea: f64,

    #[serde(default)]
    pub damping: f64,

    #[serde(default)]
    pub cd: f64,

    #[serde(default)]
    pub cdt: f64,

    #[serde(default)]
    pub ca: f64,

    pub end_a: Attachment,
    pub end_b: Attachment,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RodConfig {
    pub id: usize,
    pub role: RodRole,

    /// World positions of the ends, or body-frame positions when carried.
    pub end_a: [f64; 3],
    pub end_b: [f64; 3],

    pub diameter: f64,
    pub mass_per_length: f64,

    #[serde(default)]
    pub cd: f64,

    #[serde(default)]
    pub ca: f64,

    /// Id of the carrying body. Carried rods must be fixed or pinned.
    #[serde(default)]
    pub body: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BodyConfig {
    pub id: usize,
    pub role: ObjectRole,

    /// Reference point position followed by roll, pitch and yaw.
    #[serde(default)]
    pub pose: [f64; 6],

    pub mass: f64,

    #[serde(default)]
    pub volume: f64,

    #[serde(default)]
    pub cg: [f64; 3],

    pub inertia: [f64; 3],

    #[serde(default)]
    pub cda: f64,

    #[serde(default)]
    pub ca: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureConfig {
    /// Id of the connection the lines break from.
    pub connection: usize,

    /// Ids of the lines whose ends at that connection detach.
    pub lines: Vec<usize>,

    #[serde(default = "never")]
    pub tension: f64,

    #[serde(default = "never")]
    pub time: f64,
}

fn never() -> f64 {
    f64::INFINITY
}
