use std::f64::consts::PI;

use hawser_core::{
    Checkpoint, Error, ObjectKind, PhysicalObject, Role, WordReader, checkpoint::push_f64s,
};
use nalgebra::Vector3;
use serde::Deserialize;

use super::{End, Line, LineEnd, require_dof, unit, vector3, write3};
use crate::env::Env;

/// How a rod is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RodRole {
    /// Both position and orientation are integrated (12 state components).
    Free,

    /// End A follows its parent; the orientation is integrated (6 state
    /// components).
    Pinned,

    /// Cantilevered to the host: end A position and axis direction are
    /// prescribed (6 coupled DOF).
    Coupled,

    /// End A position is prescribed (3 coupled DOF); the axis keeps the
    /// direction it was built with.
    CoupledPinned,

    /// Held by the seabed or a parent body.
    Fixed,
}

impl RodRole {
    /// The object role this rod role maps to.
    #[must_use]
    pub fn role(self) -> Role {
        match self {
            RodRole::Free | RodRole::Pinned => Role::Free,
            RodRole::Coupled | RodRole::CoupledPinned => Role::Coupled,
            RodRole::Fixed => Role::Fixed,
        }
    }
}

/// Physical properties of a rod.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RodProps {
    pub diameter: f64,
    pub mass_per_length: f64,

    /// Transverse drag coefficient.
    pub cd: f64,

    /// Transverse added mass coefficient.
    pub ca: f64,
}

/// A rigid cylinder between end A and end B.
///
/// The pose is end A's position plus the unit axis `q` pointing to end B.
/// Rotations are integrated as `q̇ = ω × q`, with the angular velocity kept
/// perpendicular to the axis; spin about the axis is not modelled.
#[derive(Debug, Clone, PartialEq)]
pub struct Rod {
    id: usize,
    role: RodRole,
    props: RodProps,
    length: f64,

    r_a: Vector3<f64>,
    q: Vector3<f64>,
    v_a: Vector3<f64>,
    w: Vector3<f64>,

    // Host kinematics at the start of the coupling step.
    ves_r: Vector3<f64>,
    ves_q: Vector3<f64>,
    ves_v: Vector3<f64>,
    ves_w: Vector3<f64>,

    attached: Vec<(End, LineEnd)>,

    net_force: Vector3<f64>,
    net_moment: Vector3<f64>,
    own_mass: f64,
    end_masses: [f64; 2],
}

impl Rod {
    /// Creates a rod at rest between two points.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the ends coincide.
    pub fn new(
        id: usize,
        role: RodRole,
        props: RodProps,
        end_a: Vector3<f64>,
        end_b: Vector3<f64>,
    ) -> Result<Self, Error> {
        let axis = end_b - end_a;
        let q = unit(&axis)
            .ok_or_else(|| Error::invalid_configuration(format!("rod {id} has coincident ends")))?;

        Ok(Self {
            id,
            role,
            props,
            length: axis.norm(),
            r_a: end_a,
            q,
            v_a: Vector3::zeros(),
            w: Vector3::zeros(),
            ves_r: end_a,
            ves_q: q,
            ves_v: Vector3::zeros(),
            ves_w: Vector3::zeros(),
            attached: Vec::new(),
            net_force: Vector3::zeros(),
            net_moment: Vector3::zeros(),
            own_mass: 0.0,
            end_masses: [0.0; 2],
        })
    }

    #[must_use]
    pub fn rod_role(&self) -> RodRole {
        self.role
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[must_use]
    pub fn axis(&self) -> Vector3<f64> {
        self.q
    }

    #[must_use]
    pub fn end_position(&self, end: End) -> Vector3<f64> {
        match end {
            End::A => self.r_a,
            End::B => self.r_a + self.q * self.length,
        }
    }

    #[must_use]
    pub fn end_velocity(&self, end: End) -> Vector3<f64> {
        match end {
            End::A => self.v_a,
            End::B => self.v_a + self.w.cross(&(self.q * self.length)),
        }
    }

    #[must_use]
    pub fn attached(&self) -> &[(End, LineEnd)] {
        &self.attached
    }

    pub fn add_line(&mut self, at: End, end: LineEnd) {
        self.attached.push((at, end));
    }

    /// Places end A and the axis, for a rod fixed to a parent body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the rod is fixed.
    pub fn set_pose(
        &mut self,
        r_a: Vector3<f64>,
        q: Vector3<f64>,
        v_a: Vector3<f64>,
        w: Vector3<f64>,
    ) -> Result<(), Error> {
        if self.role != RodRole::Fixed {
            return Err(self.role_error("cannot be posed by a parent"));
        }
        self.r_a = r_a;
        self.q = q;
        self.v_a = v_a;
        self.w = w;
        Ok(())
    }

    /// Places end A of a pinned rod, as its parent body moves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the rod is pinned.
    pub fn set_anchor(&mut self, r_a: Vector3<f64>, v_a: Vector3<f64>) -> Result<(), Error> {
        if self.role != RodRole::Pinned {
            return Err(self.role_error("has no pinned end"));
        }
        self.r_a = r_a;
        self.v_a = v_a;
        Ok(())
    }

    /// Records the host kinematics at the start of a coupling step.
    ///
    /// A cantilevered rod takes end A position and axis direction as
    /// positions, end A velocity and angular velocity as velocities. A
    /// coupled pinned rod takes end A position and velocity only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the rod is coupled and the
    /// slices match its coupled DOF, or if a prescribed axis is zero.
    pub fn initiate_step(&mut self, r: &[f64], rd: &[f64]) -> Result<(), Error> {
        match self.role {
            RodRole::Coupled => {
                require_dof("rod", self.id, 6, r, rd)?;
                let q = unit(&vector3(&r[3..])).ok_or_else(|| {
                    Error::invalid_input(format!("rod {} got a zero axis", self.id))
                })?;
                self.ves_r = vector3(r);
                self.ves_q = q;
                self.ves_v = vector3(rd);
                self.ves_w = vector3(&rd[3..]);
            }
            RodRole::CoupledPinned => {
                require_dof("rod", self.id, 3, r, rd)?;
                self.ves_r = vector3(r);
                self.ves_v = vector3(rd);
            }
            _ => return Err(self.role_error("takes no host kinematics")),
        }
        Ok(())
    }

    /// Moves a coupled rod `elapsed` seconds into the coupling step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the rod is coupled.
    pub fn update_fairlead(&mut self, elapsed: f64) -> Result<(), Error> {
        match self.role {
            RodRole::Coupled => {
                let turned = self.ves_q + self.ves_w.cross(&self.ves_q) * elapsed;
                self.q = unit(&turned).unwrap_or(self.ves_q);
                self.w = self.ves_w;
            }
            RodRole::CoupledPinned => {}
            _ => return Err(self.role_error("takes no host kinematics")),
        }
        self.r_a = self.ves_r + self.ves_v * elapsed;
        self.v_a = self.ves_v;
        Ok(())
    }

    /// Offsets of the axis and angular velocity within the free state.
    fn rotation_offsets(&self) -> (usize, usize) {
        if self.role == RodRole::Free { (3, 9) } else { (0, 3) }
    }

    fn role_error(&self, what: &str) -> Error {
        Error::invalid_input(format!("rod {} is {:?} and {what}", self.id, self.role))
    }

    /// Gathers weight, buoyancy, drag and attached line ends as a force and a
    /// moment about end A.
    pub fn compute_forces(&mut self, lines: &[Line], env: &Env) {
        let p = &self.props;
        let half = self.q * (0.5 * self.length);
        let center_velocity = self.v_a + self.w.cross(&half);
        let area = 0.25 * PI * p.diameter * p.diameter;
        let volume = area * self.length;

        let relative = -center_velocity;
        let relative_n = relative - self.q * self.q.dot(&relative);
        let body_force = env.net_weight(p.mass_per_length * self.length, volume)
            + env.drag(p.cd * p.diameter * self.length, &relative_n);

        self.net_force = body_force;
        self.net_moment = half.cross(&body_force);
        self.own_mass = (p.mass_per_length + p.ca * env.rho * area) * self.length;
        self.end_masses = [0.0; 2];

        for (at, end) in &self.attached {
            let line = &lines[end.line];
            let force = line.end_force(end.end);
            let arm = self.end_position(*at) - self.r_a;
            self.net_force += force;
            self.net_moment += arm.cross(&force);
            self.end_masses[usize::from(*at == End::B)] += line.end_mass(end.end)[(0, 0)];
        }
    }

    #[must_use]
    pub fn net_force(&self) -> Vector3<f64> {
        self.net_force
    }

    /// Net moment about end A.
    #[must_use]
    pub fn net_moment(&self) -> Vector3<f64> {
        self.net_moment
    }

    /// Total mass including added mass and attached line ends, as of the
    /// last [`Rod::compute_forces`].
    #[must_use]
    pub fn total_mass(&self) -> f64 {
        self.own_mass + self.end_masses[0] + self.end_masses[1]
    }

    /// Distance from end A to the centre of mass along the axis.
    #[must_use]
    pub fn center_of_mass(&self) -> f64 {
        (self.own_mass * 0.5 * self.length + self.end_masses[1] * self.length) / self.total_mass()
    }

    /// Transverse moment of inertia about a point `s` along the axis.
    fn inertia_about(&self, s: f64) -> f64 {
        let m = self.own_mass;
        let l = self.length;
        m * (l * l / 12.0 + (0.5 * l - s).powi(2))
            + self.end_masses[0] * s * s
            + self.end_masses[1] * (l - s).powi(2)
    }

    fn angular_acceleration(
        &self,
        moment: &Vector3<f64>,
        inertia: f64,
    ) -> Result<Vector3<f64>, Error> {
        if inertia <= 0.0 {
            return Err(Error::invalid_state(format!("rod {} has no rotational inertia", self.id)));
        }
        Ok((moment - self.q * self.q.dot(moment)) / inertia)
    }
}

impl PhysicalObject for Rod {
    fn id(&self) -> usize {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Rod
    }

    fn role(&self) -> Role {
        self.role.role()
    }

    fn state_len(&self) -> usize {
        match self.role {
            RodRole::Free => 12,
            RodRole::Pinned => 6,
            _ => 0,
        }
    }

    fn coupled_dof(&self) -> usize {
        match self.role {
            RodRole::Coupled => 6,
            RodRole::CoupledPinned => 3,
            _ => 0,
        }
    }

    fn initial_state(&self, out: &mut [f64]) -> Result<(), Error> {
        self.require_free(out.len())?;
        let (q_at, w_at) = self.rotation_offsets();
        if self.role == RodRole::Free {
            write3(&mut out[0..], &self.r_a);
            write3(&mut out[6..], &self.v_a);
        }
        write3(&mut out[q_at..], &self.q);
        write3(&mut out[w_at..], &self.w);
        Ok(())
    }

    fn set_state(&mut self, state: &[f64]) -> Result<(), Error> {
        self.require_free(state.len())?;
        let (q_at, w_at) = self.rotation_offsets();
        let q = unit(&vector3(&state[q_at..]))
            .ok_or_else(|| Error::invalid_input(format!("rod {} state has a zero axis", self.id)))?;
        let w = vector3(&state[w_at..]);

        if self.role == RodRole::Free {
            self.r_a = vector3(state);
            self.v_a = vector3(&state[6..]);
        }
        self.q = q;
        self.w = w - q * q.dot(&w);
        Ok(())
    }

    fn state_deriv(&self, out: &mut [f64]) -> Result<(), Error> {
        self.require_free(out.len())?;
        match self.role {
            RodRole::Free => {
                let mass = self.total_mass();
                if mass <= 0.0 {
                    return Err(Error::invalid_state(format!("rod {} is massless", self.id)));
                }
                let s = self.center_of_mass();
                let to_a = -self.q * s;
                let moment = self.net_moment - (self.q * s).cross(&self.net_force);
                let alpha = self.angular_acceleration(&moment, self.inertia_about(s))?;
                let a_a = self.net_force / mass
                    + alpha.cross(&to_a)
                    + self.w.cross(&self.w.cross(&to_a));

                write3(&mut out[0..], &self.v_a);
                write3(&mut out[3..], &self.w.cross(&self.q));
                write3(&mut out[6..], &a_a);
                write3(&mut out[9..], &alpha);
            }
            _ => {
                let alpha = self.angular_acceleration(&self.net_moment, self.inertia_about(0.0))?;
                write3(&mut out[0..], &self.w.cross(&self.q));
                write3(&mut out[3..], &alpha);
            }
        }
        Ok(())
    }
}

/// Host kinematics of a coupled rod.
impl Checkpoint for Rod {
    fn write_words(&self, out: &mut Vec<u64>) {
        for v in [&self.ves_r, &self.ves_q, &self.ves_v, &self.ves_w] {
            push_f64s(out, v.as_slice());
        }
    }

    fn deserialize<'a>(&mut self, data: &'a [u64]) -> Result<&'a [u64], Error> {
        let mut reader = WordReader::new(data);
        let mut words = [0.0; 12];
        reader.f64s(&mut words)?;
        self.ves_r = vector3(&words[0..]);
        self.ves_q = vector3(&words[3..]);
        self.ves_v = vector3(&words[6..]);
        self.ves_w = vector3(&words[9..]);
        Ok(reader.rest())
    }
}
