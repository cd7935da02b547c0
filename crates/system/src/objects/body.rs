use hawser_core::{
    Checkpoint, Error, ObjectKind, PhysicalObject, Role, WordReader, checkpoint::push_f64s,
};
use nalgebra::{Matrix3, Matrix6, Rotation3, Vector3, Vector6};

use super::{Connection, End, Rod, RodRole, require_dof};
use crate::env::Env;

/// Physical properties of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyProps {
    pub mass: f64,
    pub volume: f64,

    /// Centre of gravity in the body frame.
    pub cg: Vector3<f64>,

    /// Principal moments of inertia about the centre of gravity.
    pub inertia: Vector3<f64>,

    /// Translational drag coefficient times area, m².
    pub cda: f64,

    /// Translational added mass coefficient.
    pub ca: f64,
}

/// A connection carried by a body, at a body-frame offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarriedConnection {
    pub index: usize,
    pub offset: Vector3<f64>,
}

/// A rod carried by a body: end A at a body-frame offset and, for fixed
/// rods, the axis in the body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarriedRod {
    pub index: usize,
    pub offset: Vector3<f64>,
    pub axis: Vector3<f64>,
}

/// A six degree-of-freedom rigid body.
///
/// The pose holds the reference point position followed by roll, pitch and
/// yaw; the velocity holds the reference point velocity followed by the
/// angular velocity. Angle rates are taken equal to the angular velocity,
/// which holds for small rotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    id: usize,
    role: Role,
    props: BodyProps,

    r6: Vector6<f64>,
    v6: Vector6<f64>,

    // Host kinematics at the start of the coupling step.
    ves_r6: Vector6<f64>,
    ves_v6: Vector6<f64>,

    connections: Vec<CarriedConnection>,
    rods: Vec<CarriedRod>,

    net_force: Vector6<f64>,
    mass_matrix: Matrix6<f64>,
}

/// Cross-product matrix: `skew(p) * v == p × v`.
fn skew(p: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -p.z, p.y, p.z, 0.0, -p.x, -p.y, p.x, 0.0)
}

/// Adds a point mass located at `p` from the reference point.
fn add_point_mass(m6: &mut Matrix6<f64>, mass: &Matrix3<f64>, p: &Vector3<f64>) {
    let h = skew(p);
    let mut block = m6.fixed_view_mut::<3, 3>(0, 0);
    block += mass;
    let mut block = m6.fixed_view_mut::<3, 3>(0, 3);
    block -= mass * h;
    let mut block = m6.fixed_view_mut::<3, 3>(3, 0);
    block += h * mass;
    let mut block = m6.fixed_view_mut::<3, 3>(3, 3);
    block -= h * mass * h;
}

fn add_load(f6: &mut Vector6<f64>, force: &Vector3<f64>, moment: &Vector3<f64>) {
    let mut f = f6.fixed_rows_mut::<3>(0);
    f += force;
    let mut m = f6.fixed_rows_mut::<3>(3);
    m += moment;
}

impl Body {
    #[must_use]
    pub fn new(id: usize, role: Role, props: BodyProps, pose: Vector6<f64>) -> Self {
        Self {
            id,
            role,
            props,
            r6: pose,
            v6: Vector6::zeros(),
            ves_r6: pose,
            ves_v6: Vector6::zeros(),
            connections: Vec::new(),
            rods: Vec::new(),
            net_force: Vector6::zeros(),
            mass_matrix: Matrix6::zeros(),
        }
    }

    #[must_use]
    pub fn pose(&self) -> Vector6<f64> {
        self.r6
    }

    #[must_use]
    pub fn velocity(&self) -> Vector6<f64> {
        self.v6
    }

    #[must_use]
    pub fn connections(&self) -> &[CarriedConnection] {
        &self.connections
    }

    #[must_use]
    pub fn rods(&self) -> &[CarriedRod] {
        &self.rods
    }

    pub fn carry_connection(&mut self, index: usize, offset: Vector3<f64>) {
        self.connections.push(CarriedConnection { index, offset });
    }

    pub fn carry_rod(&mut self, index: usize, offset: Vector3<f64>, axis: Vector3<f64>) {
        self.rods.push(CarriedRod { index, offset, axis });
    }

    fn position(&self) -> Vector3<f64> {
        self.r6.fixed_rows::<3>(0).into_owned()
    }

    fn angular_velocity(&self) -> Vector3<f64> {
        self.v6.fixed_rows::<3>(3).into_owned()
    }

    #[must_use]
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(self.r6[3], self.r6[4], self.r6[5])
    }

    /// World position and velocity of a body-frame point.
    #[must_use]
    pub fn point_kinematics(&self, offset: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let arm = self.rotation() * offset;
        let v = self.v6.fixed_rows::<3>(0).into_owned();
        (self.position() + arm, v + self.angular_velocity().cross(&arm))
    }

    /// Places carried connections and rods at the current pose.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a carried object is not fixed (or,
    /// for rods, pinned).
    pub fn place_children(
        &self,
        connections: &mut [Connection],
        rods: &mut [Rod],
    ) -> Result<(), Error> {
        for carried in &self.connections {
            let (r, rd) = self.point_kinematics(&carried.offset);
            connections[carried.index].set_kinematics(r, rd)?;
        }

        let rotation = self.rotation();
        for carried in &self.rods {
            let (r, rd) = self.point_kinematics(&carried.offset);
            let rod = &mut rods[carried.index];
            if rod.rod_role() == RodRole::Pinned {
                rod.set_anchor(r, rd)?;
            } else {
                rod.set_pose(r, rotation * carried.axis, rd, self.angular_velocity())?;
            }
        }
        Ok(())
    }

    /// Records the host kinematics at the start of a coupling step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the body is coupled and both
    /// slices hold six components.
    pub fn initiate_step(&mut self, r: &[f64], rd: &[f64]) -> Result<(), Error> {
        self.require_coupled()?;
        require_dof("body", self.id, 6, r, rd)?;
        self.ves_r6 = Vector6::from_column_slice(r);
        self.ves_v6 = Vector6::from_column_slice(rd);
        Ok(())
    }

    /// Moves a coupled body `elapsed` seconds into the coupling step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the body is coupled.
    pub fn update_fairlead(&mut self, elapsed: f64) -> Result<(), Error> {
        self.require_coupled()?;
        self.r6 = self.ves_r6 + self.ves_v6 * elapsed;
        self.v6 = self.ves_v6;
        Ok(())
    }

    fn require_coupled(&self) -> Result<(), Error> {
        if self.role == Role::Coupled {
            Ok(())
        } else {
            Err(Error::invalid_input(format!(
                "body {} is {} and takes no host kinematics",
                self.id, self.role
            )))
        }
    }

    /// Gathers the body's own loads and those of everything it carries,
    /// about the reference point, along with the 6×6 mass matrix.
    pub fn compute_forces(&mut self, connections: &[Connection], rods: &[Rod], env: &Env) {
        let p = self.props;
        let origin = self.position();
        let rotation = self.rotation();
        let velocity = self.v6.fixed_rows::<3>(0).into_owned();

        let mut f6 = Vector6::zeros();
        let mut m6 = Matrix6::zeros();

        let cg = rotation * p.cg;
        let weight = Vector3::new(0.0, 0.0, -p.mass * env.g);
        let buoyancy = Vector3::new(0.0, 0.0, env.rho * p.volume * env.g);
        let drag = -env.drag(p.cda, &velocity);
        add_load(&mut f6, &(weight + buoyancy + drag), &cg.cross(&weight));

        add_point_mass(&mut m6, &Matrix3::from_diagonal_element(p.mass), &cg);
        let mut rotational = m6.fixed_view_mut::<3, 3>(3, 3);
        rotational +=
            rotation.matrix() * Matrix3::from_diagonal(&p.inertia) * rotation.matrix().transpose();
        let added = Matrix3::from_diagonal_element(p.ca * env.rho * p.volume);
        add_point_mass(&mut m6, &added, &Vector3::zeros());

        for carried in &self.connections {
            let connection = &connections[carried.index];
            let arm = connection.position() - origin;
            let force = connection.net_force();
            add_load(&mut f6, &force, &arm.cross(&force));
            add_point_mass(&mut m6, &connection.net_mass(), &arm);
        }

        for carried in &self.rods {
            let rod = &rods[carried.index];
            let arm = rod.end_position(End::A) - origin;
            let force = rod.net_force();
            let mut moment = arm.cross(&force);
            let mass_arm = if rod.rod_role() == RodRole::Pinned {
                arm
            } else {
                moment += rod.net_moment();
                arm + rod.axis() * rod.center_of_mass()
            };
            add_load(&mut f6, &force, &moment);
            add_point_mass(&mut m6, &Matrix3::from_diagonal_element(rod.total_mass()), &mass_arm);
        }

        self.net_force = f6;
        self.mass_matrix = m6;
    }

    /// Net force and moment about the reference point.
    #[must_use]
    pub fn net_force(&self) -> Vector6<f64> {
        self.net_force
    }

    #[must_use]
    pub fn mass_matrix(&self) -> Matrix6<f64> {
        self.mass_matrix
    }
}

impl PhysicalObject for Body {
    fn id(&self) -> usize {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Body
    }

    fn role(&self) -> Role {
        self.role
    }

    fn state_len(&self) -> usize {
        if self.role == Role::Free { 12 } else { 0 }
    }

    fn coupled_dof(&self) -> usize {
        if self.role == Role::Coupled { 6 } else { 0 }
    }

    fn initial_state(&self, out: &mut [f64]) -> Result<(), Error> {
        self.require_free(out.len())?;
        out[..6].copy_from_slice(self.r6.as_slice());
        out[6..].copy_from_slice(self.v6.as_slice());
        Ok(())
    }

    fn set_state(&mut self, state: &[f64]) -> Result<(), Error> {
        self.require_free(state.len())?;
        self.r6 = Vector6::from_column_slice(&state[..6]);
        self.v6 = Vector6::from_column_slice(&state[6..]);
        Ok(())
    }

    fn state_deriv(&self, out: &mut [f64]) -> Result<(), Error> {
        self.require_free(out.len())?;
        let acceleration = self
            .mass_matrix
            .lu()
            .solve(&self.net_force)
            .ok_or_else(|| {
                Error::invalid_state(format!("body {} has a singular mass matrix", self.id))
            })?;
        out[..6].copy_from_slice(self.v6.as_slice());
        out[6..].copy_from_slice(acceleration.as_slice());
        Ok(())
    }
}

/// Host kinematics of a coupled body.
impl Checkpoint for Body {
    fn write_words(&self, out: &mut Vec<u64>) {
        push_f64s(out, self.ves_r6.as_slice());
        push_f64s(out, self.ves_v6.as_slice());
    }

    fn deserialize<'a>(&mut self, data: &'a [u64]) -> Result<&'a [u64], Error> {
        let mut reader = WordReader::new(data);
        let mut words = [0.0; 12];
        reader.f64s(&mut words)?;
        self.ves_r6 = Vector6::from_column_slice(&words[..6]);
        self.ves_v6 = Vector6::from_column_slice(&words[6..]);
        Ok(reader.rest())
    }
}
