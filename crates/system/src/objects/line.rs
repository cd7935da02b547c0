use std::f64::consts::PI;

use hawser_core::{Error, ObjectKind, PhysicalObject, Role};
use nalgebra::{Matrix3, Vector3};

use super::{End, unit, vector3, write3};
use crate::{env::Env, waves::WaveBuffer};

/// Material and hydrodynamic properties of a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineProps {
    /// Volume-equivalent diameter, m.
    pub diameter: f64,

    /// Mass per unit length in air, kg/m.
    pub mass_per_length: f64,

    /// Axial stiffness, N.
    pub ea: f64,

    /// Internal axial damping, N·s.
    pub damping: f64,

    /// Transverse drag coefficient.
    pub cd: f64,

    /// Tangential drag coefficient.
    pub cdt: f64,

    /// Transverse added mass coefficient.
    pub ca: f64,
}

impl LineProps {
    fn area(&self) -> f64 {
        0.25 * PI * self.diameter * self.diameter
    }
}

/// A lumped-mass line.
///
/// The unstretched length is split into `N` equal segments joining `N + 1`
/// nodes. The end nodes follow whatever they are attached to; the `N − 1`
/// internal nodes are free, with state laid out as all positions followed by
/// all velocities. Segments carry tension only when stretched, plus internal
/// damping proportional to the strain rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    id: usize,
    props: LineProps,
    segment_length: f64,

    r: Vec<Vector3<f64>>,
    rd: Vec<Vector3<f64>>,

    /// Index of node 0 among the wave query points.
    wave_offset: usize,

    forces: Vec<Vector3<f64>>,
    masses: Vec<f64>,
}

impl Line {
    /// Creates a line of `segments` equal segments, all nodes at the origin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for zero segments or a
    /// non-positive length.
    pub fn new(
        id: usize,
        segments: usize,
        length: f64,
        props: LineProps,
        wave_offset: usize,
    ) -> Result<Self, Error> {
        if segments == 0 {
            return Err(Error::invalid_configuration(format!(
                "line {id} needs at least one segment"
            )));
        }
        if !(length.is_finite() && length > 0.0) {
            return Err(Error::invalid_configuration(format!(
                "line {id} length must be positive, got {length}"
            )));
        }

        let nodes = segments + 1;
        #[allow(clippy::cast_precision_loss)]
        let segment_length = length / segments as f64;
        Ok(Self {
            id,
            props,
            segment_length,
            r: vec![Vector3::zeros(); nodes],
            rd: vec![Vector3::zeros(); nodes],
            wave_offset,
            forces: vec![Vector3::zeros(); nodes],
            masses: vec![0.0; nodes],
        })
    }

    #[must_use]
    pub fn segments(&self) -> usize {
        self.r.len() - 1
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.r.len()
    }

    #[must_use]
    pub fn nodes(&self) -> &[Vector3<f64>] {
        &self.r
    }

    fn end_node(&self, end: End) -> usize {
        match end {
            End::A => 0,
            End::B => self.segments(),
        }
    }

    pub fn set_end_kinematics(&mut self, end: End, r: Vector3<f64>, rd: Vector3<f64>) {
        let i = self.end_node(end);
        self.r[i] = r;
        self.rd[i] = rd;
    }

    #[must_use]
    pub fn end_position(&self, end: End) -> Vector3<f64> {
        self.r[self.end_node(end)]
    }

    #[must_use]
    pub fn end_velocity(&self, end: End) -> Vector3<f64> {
        self.rd[self.end_node(end)]
    }

    /// Lays the internal nodes on the straight line between the ends, at rest.
    pub fn initialize_nodes(&mut self) {
        let n = self.segments();
        let (a, b) = (self.r[0], self.r[n]);
        for i in 1..n {
            #[allow(clippy::cast_precision_loss)]
            let s = i as f64 / n as f64;
            self.r[i] = a + (b - a) * s;
            self.rd[i] = Vector3::zeros();
        }
    }

    /// Tension of segment `i` (joining nodes `i` and `i + 1`) and its unit
    /// direction from node `i` to node `i + 1`.
    fn segment_tension(&self, i: usize) -> (f64, Vector3<f64>) {
        let dr = self.r[i + 1] - self.r[i];
        let Some(q) = unit(&dr) else {
            return (0.0, Vector3::zeros());
        };

        let l0 = self.segment_length;
        let strain = dr.norm() / l0 - 1.0;
        let strain_rate = q.dot(&(self.rd[i + 1] - self.rd[i])) / l0;

        let elastic = if strain > 0.0 { self.props.ea * strain } else { 0.0 };
        (elastic + self.props.damping * strain_rate, q)
    }

    /// Tension in the segment at one end, from the current geometry.
    #[must_use]
    pub fn end_tension(&self, end: End) -> f64 {
        let segment = match end {
            End::A => 0,
            End::B => self.segments() - 1,
        };
        self.segment_tension(segment).0
    }

    /// Net force the end node exerts on its attachment.
    #[must_use]
    pub fn end_force(&self, end: End) -> Vector3<f64> {
        self.forces[self.end_node(end)]
    }

    /// Mass the end node adds to its attachment.
    #[must_use]
    pub fn end_mass(&self, end: End) -> Matrix3<f64> {
        Matrix3::from_diagonal_element(self.masses[self.end_node(end)])
    }

    /// Computes node forces and masses for the current node kinematics.
    ///
    /// Wave kinematics are read from `waves` at the line's query points; a
    /// buffer without those points means still water.
    pub fn compute_forces(&mut self, time: f64, waves: &WaveBuffer, env: &Env) {
        let n = self.segments();
        let p = self.props;
        let area = p.area();

        for i in 0..=n {
            let length = if i == 0 || i == n {
                0.5 * self.segment_length
            } else {
                self.segment_length
            };

            let chord = self.r[(i + 1).min(n)] - self.r[i.saturating_sub(1)];
            let tangent = unit(&chord).unwrap_or_else(Vector3::zeros);
            let (u, ud) = waves
                .query(self.wave_offset + i, time)
                .unwrap_or((Vector3::zeros(), Vector3::zeros()));

            let relative = u - self.rd[i];
            let relative_t = tangent * tangent.dot(&relative);
            let relative_n = relative - relative_t;
            let ud_n = ud - tangent * tangent.dot(&ud);

            let volume = area * length;
            let mut force = env.net_weight(p.mass_per_length * length, volume)
                + env.drag(p.cd * p.diameter * length, &relative_n)
                + env.drag(p.cdt * PI * p.diameter * length, &relative_t)
                + env.rho * volume * (ud + p.ca * ud_n)
                + env.seabed_force(&self.r[i], &self.rd[i], p.diameter * length);

            if i < n {
                let (tension, q) = self.segment_tension(i);
                force += q * tension;
            }
            if i > 0 {
                let (tension, q) = self.segment_tension(i - 1);
                force -= q * tension;
            }

            self.forces[i] = force;
            self.masses[i] = (p.mass_per_length + p.ca * env.rho * area) * length;
        }
    }
}

impl PhysicalObject for Line {
    fn id(&self) -> usize {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Line
    }

    fn role(&self) -> Role {
        Role::Free
    }

    fn state_len(&self) -> usize {
        6 * (self.segments() - 1)
    }

    fn coupled_dof(&self) -> usize {
        0
    }

    fn initial_state(&self, out: &mut [f64]) -> Result<(), Error> {
        self.require_free(out.len())?;
        let (positions, velocities) = out.split_at_mut(out.len() / 2);
        for i in 1..self.segments() {
            let k = 3 * (i - 1);
            write3(&mut positions[k..], &self.r[i]);
            write3(&mut velocities[k..], &self.rd[i]);
        }
        Ok(())
    }

    fn set_state(&mut self, state: &[f64]) -> Result<(), Error> {
        self.require_free(state.len())?;
        let (positions, velocities) = state.split_at(state.len() / 2);
        for i in 1..self.segments() {
            let k = 3 * (i - 1);
            self.r[i] = vector3(&positions[k..]);
            self.rd[i] = vector3(&velocities[k..]);
        }
        Ok(())
    }

    fn state_deriv(&self, out: &mut [f64]) -> Result<(), Error> {
        self.require_free(out.len())?;
        let (velocities, accelerations) = out.split_at_mut(out.len() / 2);
        for i in 1..self.segments() {
            let k = 3 * (i - 1);
            write3(&mut velocities[k..], &self.rd[i]);
            write3(&mut accelerations[k..], &(self.forces[i] / self.masses[i]));
        }
        Ok(())
    }
}
