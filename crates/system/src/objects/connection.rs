use hawser_core::{
    Checkpoint, Error, ObjectKind, PhysicalObject, Role, WordReader, checkpoint::push_f64s,
};
use nalgebra::{Matrix3, Vector3};

use super::{Line, LineEnd, accelerate, require_dof, vector3, write3};
use crate::env::Env;

/// Physical properties of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConnectionProps {
    /// Point mass, kg.
    pub mass: f64,

    /// Displaced volume, m³.
    pub volume: f64,

    /// Constant external force, N.
    pub force: Vector3<f64>,

    /// Drag coefficient times frontal area, m².
    pub cda: f64,

    /// Added mass coefficient, relative to the displaced mass.
    pub ca: f64,
}

/// A point where line ends meet.
///
/// A free connection is a point mass integrated by the engine. A coupled one
/// follows kinematics supplied by the host, extrapolated within a coupling
/// step. A fixed one sits on the seabed or is carried by a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    id: usize,
    role: Role,
    props: ConnectionProps,

    r: Vector3<f64>,
    rd: Vector3<f64>,

    // Host kinematics at the start of the coupling step.
    r_ves: Vector3<f64>,
    rd_ves: Vector3<f64>,

    attached: Vec<LineEnd>,

    net_force: Vector3<f64>,
    net_mass: Matrix3<f64>,
}

impl Connection {
    #[must_use]
    pub fn new(id: usize, role: Role, props: ConnectionProps, position: Vector3<f64>) -> Self {
        Self {
            id,
            role,
            props,
            r: position,
            rd: Vector3::zeros(),
            r_ves: position,
            rd_ves: Vector3::zeros(),
            attached: Vec::new(),
            net_force: Vector3::zeros(),
            net_mass: Matrix3::zeros(),
        }
    }

    /// A massless free connection created where a line end broke loose.
    #[must_use]
    pub fn detached(
        id: usize,
        end: LineEnd,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
    ) -> Self {
        let mut connection = Self::new(id, Role::Free, ConnectionProps::default(), position);
        connection.rd = velocity;
        connection.attached.push(end);
        connection
    }

    #[must_use]
    pub fn position(&self) -> Vector3<f64> {
        self.r
    }

    #[must_use]
    pub fn velocity(&self) -> Vector3<f64> {
        self.rd
    }

    #[must_use]
    pub fn attached(&self) -> &[LineEnd] {
        &self.attached
    }

    pub fn add_line(&mut self, end: LineEnd) {
        self.attached.push(end);
    }

    /// Detaches a line end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the end is not attached here.
    pub fn remove_line(&mut self, end: LineEnd) -> Result<(), Error> {
        let position = self.attached.iter().position(|e| *e == end).ok_or_else(|| {
            Error::invalid_input(format!(
                "line {} end {:?} is not attached to connection {}",
                end.line + 1,
                end.end,
                self.id
            ))
        })?;
        self.attached.remove(position);
        Ok(())
    }

    /// Places a fixed connection, as its parent body moves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the connection is fixed.
    pub fn set_kinematics(&mut self, r: Vector3<f64>, rd: Vector3<f64>) -> Result<(), Error> {
        if self.role != Role::Fixed {
            return Err(Error::invalid_input(format!(
                "connection {} is {} and cannot be placed by a parent",
                self.id, self.role
            )));
        }
        self.r = r;
        self.rd = rd;
        Ok(())
    }

    /// Records the host kinematics at the start of a coupling step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the connection is coupled and
    /// both slices hold three components.
    pub fn initiate_step(&mut self, r: &[f64], rd: &[f64]) -> Result<(), Error> {
        self.require_coupled()?;
        require_dof("connection", self.id, 3, r, rd)?;
        self.r_ves = vector3(r);
        self.rd_ves = vector3(rd);
        Ok(())
    }

    /// Moves a coupled connection `elapsed` seconds into the coupling step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the connection is coupled.
    pub fn update_fairlead(&mut self, elapsed: f64) -> Result<(), Error> {
        self.require_coupled()?;
        self.r = self.r_ves + self.rd_ves * elapsed;
        self.rd = self.rd_ves;
        Ok(())
    }

    fn require_coupled(&self) -> Result<(), Error> {
        if self.role == Role::Coupled {
            Ok(())
        } else {
            Err(Error::invalid_input(format!(
                "connection {} is {} and takes no host kinematics",
                self.id, self.role
            )))
        }
    }

    /// Gathers weight, buoyancy, drag and the attached line ends.
    pub fn compute_forces(&mut self, lines: &[Line], env: &Env) {
        let p = &self.props;

        self.net_force = p.force + env.net_weight(p.mass, p.volume) - env.drag(p.cda, &self.rd);
        self.net_mass = Matrix3::from_diagonal_element(p.mass + p.ca * env.rho * p.volume);

        for end in &self.attached {
            let line = &lines[end.line];
            self.net_force += line.end_force(end.end);
            self.net_mass += line.end_mass(end.end);
        }
    }

    #[must_use]
    pub fn net_force(&self) -> Vector3<f64> {
        self.net_force
    }

    #[must_use]
    pub fn net_mass(&self) -> Matrix3<f64> {
        self.net_mass
    }
}

impl PhysicalObject for Connection {
    fn id(&self) -> usize {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Connection
    }

    fn role(&self) -> Role {
        self.role
    }

    fn state_len(&self) -> usize {
        if self.role == Role::Free { 6 } else { 0 }
    }

    fn coupled_dof(&self) -> usize {
        if self.role == Role::Coupled { 3 } else { 0 }
    }

    fn initial_state(&self, out: &mut [f64]) -> Result<(), Error> {
        self.require_free(out.len())?;
        write3(&mut out[..3], &self.r);
        write3(&mut out[3..], &self.rd);
        Ok(())
    }

    fn set_state(&mut self, state: &[f64]) -> Result<(), Error> {
        self.require_free(state.len())?;
        self.r = vector3(&state[..3]);
        self.rd = vector3(&state[3..]);
        Ok(())
    }

    fn state_deriv(&self, out: &mut [f64]) -> Result<(), Error> {
        self.require_free(out.len())?;
        let acceleration = accelerate("connection", self.id, &self.net_mass, &self.net_force)?;
        write3(&mut out[..3], &self.rd);
        write3(&mut out[3..], &acceleration);
        Ok(())
    }
}

/// Host kinematics of a coupled connection.
impl Checkpoint for Connection {
    fn write_words(&self, out: &mut Vec<u64>) {
        push_f64s(out, self.r_ves.as_slice());
        push_f64s(out, self.rd_ves.as_slice());
    }

    fn deserialize<'a>(&mut self, data: &'a [u64]) -> Result<&'a [u64], Error> {
        let mut reader = WordReader::new(data);
        let mut words = [0.0; 6];
        reader.f64s(&mut words)?;
        self.r_ves = vector3(&words[..3]);
        self.rd_ves = vector3(&words[3..]);
        Ok(reader.rest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::objects::End;

    fn coupled() -> Connection {
        Connection::new(2, Role::Coupled, ConnectionProps::default(), Vector3::zeros())
    }

    #[test]
    fn coupled_connection_extrapolates_host_motion() {
        let mut fairlead = coupled();
        fairlead.initiate_step(&[1.0, 2.0, -3.0], &[0.5, 0.0, 1.0]).unwrap();

        fairlead.update_fairlead(0.2).unwrap();

        assert_relative_eq!(fairlead.position().x, 1.1);
        assert_relative_eq!(fairlead.position().z, -2.8);
        assert_relative_eq!(fairlead.velocity().x, 0.5);
    }

    #[test]
    fn host_kinematics_need_three_components() {
        let mut fairlead = coupled();
        let err = fairlead.initiate_step(&[1.0, 2.0], &[0.0; 3]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn only_coupled_connections_take_host_kinematics() {
        let props = ConnectionProps::default();
        let mut anchor = Connection::new(1, Role::Fixed, props, Vector3::zeros());
        assert!(anchor.initiate_step(&[0.0; 3], &[0.0; 3]).is_err());
        assert!(anchor.update_fairlead(0.1).is_err());
        assert!(anchor.set_state(&[0.0; 6]).is_err());
        assert!(anchor.set_kinematics(Vector3::x(), Vector3::zeros()).is_ok());
    }

    #[test]
    fn removing_an_unknown_line_fails() {
        let mut connection = coupled();
        let end = LineEnd { line: 0, end: End::B };
        connection.add_line(end);

        let other = LineEnd { line: 0, end: End::A };
        assert!(matches!(connection.remove_line(other), Err(Error::InvalidInput(_))));

        connection.remove_line(end).unwrap();
        assert!(connection.attached().is_empty());
    }

    #[test]
    fn free_point_mass_falls_under_net_weight() {
        let props = ConnectionProps {
            mass: 2000.0,
            volume: 1.0,
            ..ConnectionProps::default()
        };
        let env = Env::default();
        let mut clump = Connection::new(1, Role::Free, props, Vector3::new(0.0, 0.0, -10.0));
        clump.compute_forces(&[], &env);

        let mut deriv = [0.0; 6];
        clump.state_deriv(&mut deriv).unwrap();

        let expected = (1025.0 - 2000.0) * 9.81 / 2000.0;
        assert_relative_eq!(deriv[5], expected, epsilon = 1e-12);
        assert_eq!(clump.state_len(), 6);
        assert_eq!(clump.coupled_dof(), 0);
    }

    #[test]
    fn massless_connection_without_lines_is_singular() {
        let props = ConnectionProps::default();
        let mut ghost = Connection::new(4, Role::Free, props, Vector3::zeros());
        ghost.compute_forces(&[], &Env::default());

        let err = ghost.state_deriv(&mut [0.0; 6]).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }
}
