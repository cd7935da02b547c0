use std::collections::HashSet;

use hawser_core::{
    Checkpoint, Dynamics, Error, ObjectKind, PhysicalObject, Role, Slot, StateLayout, StateVector,
    layout::DETACHED_END_LEN,
};
use nalgebra::{Vector3, Vector6};

use crate::{
    config::{Attachment, SystemConfig},
    env::Env,
    failure::FailureCondition,
    objects::{
        Body, BodyProps, Connection, ConnectionProps, End, Line, LineEnd, LineProps, Rod,
        RodProps, RodRole,
    },
    waves::WaveBuffer,
};

/// The object collection the engine advances.
#[derive(Debug, Clone)]
pub(crate) struct Model {
    pub env: Env,
    pub connections: Vec<Connection>,
    pub lines: Vec<Line>,
    pub rods: Vec<Rod>,
    pub bodies: Vec<Body>,
    pub layout: StateLayout,
    pub waves: WaveBuffer,
    pub failures: Vec<FailureCondition>,

    /// Failure indices in the order they tripped.
    pub trip_log: Vec<usize>,

    /// Time of the last host kinematics.
    pub step_start: f64,
}

fn check_ids(kind: &str, ids: impl Iterator<Item = usize>) -> Result<(), Error> {
    for (i, id) in ids.enumerate() {
        if id != i + 1 {
            return Err(Error::invalid_configuration(format!(
                "{kind} ids must be numbered 1, 2, ... in order; entry {} has id {id}",
                i + 1
            )));
        }
    }
    Ok(())
}

fn lookup(kind: &str, id: usize, count: usize) -> Result<usize, Error> {
    if (1..=count).contains(&id) {
        Ok(id - 1)
    } else {
        Err(Error::invalid_configuration(format!("there is no {kind} {id}")))
    }
}

impl Model {
    /// Builds and places every object described by `config`.
    pub fn build(config: &SystemConfig) -> Result<Self, Error> {
        check_ids("connection", config.connections.iter().map(|c| c.id))?;
        check_ids("line", config.lines.iter().map(|l| l.id))?;
        check_ids("rod", config.rods.iter().map(|r| r.id))?;
        check_ids("body", config.bodies.iter().map(|b| b.id))?;

        let mut bodies: Vec<Body> = config
            .bodies
            .iter()
            .map(|b| {
                let props = BodyProps {
                    mass: b.mass,
                    volume: b.volume,
                    cg: Vector3::from(b.cg),
                    inertia: Vector3::from(b.inertia),
                    cda: b.cda,
                    ca: b.ca,
                };
                Body::new(b.id, b.role.into(), props, Vector6::from_column_slice(&b.pose))
            })
            .collect();

        let mut connections = Vec::with_capacity(config.connections.len());
        for (index, c) in config.connections.iter().enumerate() {
            let role = Role::from(c.role);
            let position = Vector3::from(c.position);
            if let Some(body) = c.body {
                if role != Role::Fixed {
                    return Err(Error::invalid_configuration(format!(
                        "connection {} is carried by body {body} and must be fixed",
                        c.id
                    )));
                }
                let body = lookup("body", body, bodies.len())?;
                bodies[body].carry_connection(index, position);
            }
            let props = ConnectionProps {
                mass: c.mass,
                volume: c.volume,
                force: Vector3::from(c.force),
                cda: c.cda,
                ca: c.ca,
            };
            connections.push(Connection::new(c.id, role, props, position));
        }

        let mut rods = Vec::with_capacity(config.rods.len());
        for (index, r) in config.rods.iter().enumerate() {
            let (end_a, end_b) = (Vector3::from(r.end_a), Vector3::from(r.end_b));
            let props = RodProps {
                diameter: r.diameter,
                mass_per_length: r.mass_per_length,
                cd: r.cd,
                ca: r.ca,
            };
            let rod = Rod::new(r.id, r.role, props, end_a, end_b)?;
            if let Some(body) = r.body {
                if !matches!(r.role, RodRole::Fixed | RodRole::Pinned) {
                    return Err(Error::invalid_configuration(format!(
                        "rod {} is carried by body {body} and must be fixed or pinned",
                        r.id
                    )));
                }
                let body = lookup("body", body, bodies.len())?;
                bodies[body].carry_rod(index, end_a, rod.axis());
            }
            rods.push(rod);
        }

        let mut lines = Vec::with_capacity(config.lines.len());
        let mut wave_offset = 0;
        for (index, l) in config.lines.iter().enumerate() {
            let props = LineProps {
                diameter: l.diameter,
                mass_per_length: l.mass_per_length,
                ea: l.ea,
                damping: l.damping,
                cd: l.cd,
                cdt: l.cdt,
                ca: l.ca,
            };
            let line = Line::new(l.id, l.segments, l.length, props, wave_offset)?;
            wave_offset += line.node_count();
            lines.push(line);

            for (attachment, end) in [(l.end_a, End::A), (l.end_b, End::B)] {
                let line_end = LineEnd { line: index, end };
                match attachment {
                    Attachment::Connection { connection } => {
                        let connection = lookup("connection", connection, connections.len())?;
                        connections[connection].add_line(line_end);
                    }
                    Attachment::Rod { rod, end: at } => {
                        let rod = lookup("rod", rod, rods.len())?;
                        rods[rod].add_line(at, line_end);
                    }
                }
            }
        }

        // A line end can only break loose once.
        let mut claimed = HashSet::new();
        let mut failures = Vec::with_capacity(config.failures.len());
        for f in &config.failures {
            let connection = lookup("connection", f.connection, connections.len())?;
            let mut ends = Vec::new();
            for &line in &f.lines {
                let line = lookup("line", line, lines.len())?;
                let before = ends.len();
                ends.extend(connections[connection].attached().iter().filter(|e| e.line == line));
                if ends.len() == before {
                    return Err(Error::invalid_configuration(format!(
                        "failure on connection {} lists line {}, which is not attached there",
                        f.connection,
                        line + 1
                    )));
                }
                if !ends[before..].iter().all(|&end| claimed.insert(end)) {
                    return Err(Error::invalid_configuration(format!(
                        "line {} is listed more than once among the failures on connection {}",
                        line + 1,
                        f.connection
                    )));
                }
            }
            failures.push(FailureCondition::new(connection, ends, f.tension, f.time));
        }

        let objects = lines
            .iter()
            .map(|o| o as &dyn PhysicalObject)
            .chain(connections.iter().map(|o| o as &dyn PhysicalObject))
            .chain(rods.iter().map(|o| o as &dyn PhysicalObject))
            .chain(bodies.iter().map(|o| o as &dyn PhysicalObject));
        let layout = StateLayout::from_objects(objects)?;

        let mut model = Self {
            env: config.env,
            connections,
            lines,
            rods,
            bodies,
            layout,
            waves: WaveBuffer::new(wave_offset),
            failures,
            trip_log: Vec::new(),
            step_start: 0.0,
        };
        model.place()?;
        model.lines.iter_mut().for_each(Line::initialize_nodes);
        Ok(model)
    }

    /// Tension at both ends of every line, line by line.
    pub fn end_tensions(&self) -> Vec<f64> {
        self.lines
            .iter()
            .flat_map(|line| [line.end_tension(End::A), line.end_tension(End::B)])
            .collect()
    }

    /// Number of wave query points, one per line node.
    pub fn wave_point_count(&self) -> usize {
        self.lines.iter().map(Line::node_count).sum()
    }

    /// Records host kinematics for every coupled object, in coupled-table
    /// order. Nothing changes unless every object accepts its share.
    pub fn set_coupled_kinematics(
        &mut self,
        x: &[f64],
        xd: &[f64],
        time: f64,
    ) -> Result<(), Error> {
        let expected = self.layout.total_coupled_dof();
        if x.len() != expected || xd.len() != expected {
            return Err(Error::invalid_input(format!(
                "coupled kinematics need {expected} components, got {} positions and {} velocities",
                x.len(),
                xd.len()
            )));
        }

        let mut bodies = self.bodies.clone();
        let mut rods = self.rods.clone();
        let mut connections = self.connections.clone();

        let mut offset = 0;
        for (kind, slot) in self.layout.coupled_order() {
            let (r, rd) = (&x[offset..offset + slot.dof], &xd[offset..offset + slot.dof]);
            match kind {
                ObjectKind::Body => bodies[slot.index].initiate_step(r, rd)?,
                ObjectKind::Rod => rods[slot.index].initiate_step(r, rd)?,
                ObjectKind::Connection => connections[slot.index].initiate_step(r, rd)?,
                ObjectKind::Line => {}
            }
            offset += slot.dof;
        }

        self.bodies = bodies;
        self.rods = rods;
        self.connections = connections;
        self.step_start = time;
        Ok(())
    }

    /// Moves coupled objects along the host kinematics to `time`.
    fn move_coupled(&mut self, time: f64) -> Result<(), Error> {
        let elapsed = time - self.step_start;
        for slot in self.layout.coupled(ObjectKind::Body) {
            self.bodies[slot.index].update_fairlead(elapsed)?;
        }
        for slot in self.layout.coupled(ObjectKind::Rod) {
            self.rods[slot.index].update_fairlead(elapsed)?;
        }
        for slot in self.layout.coupled(ObjectKind::Connection) {
            self.connections[slot.index].update_fairlead(elapsed)?;
        }
        Ok(())
    }

    /// Places everything carried by bodies, then every line end.
    pub fn place(&mut self) -> Result<(), Error> {
        for body in &self.bodies {
            body.place_children(&mut self.connections, &mut self.rods)?;
        }

        for connection in &self.connections {
            let (r, rd) = (connection.position(), connection.velocity());
            for end in connection.attached() {
                self.lines[end.line].set_end_kinematics(end.end, r, rd);
            }
        }
        for rod in &self.rods {
            for (at, end) in rod.attached() {
                let (r, rd) = (rod.end_position(*at), rod.end_velocity(*at));
                self.lines[end.line].set_end_kinematics(end.end, r, rd);
            }
        }
        Ok(())
    }

    /// Brings coupled objects to `time` and lays out a fresh set of lines
    /// between their ends.
    pub fn initialize(&mut self, time: f64, state: &mut StateVector) -> Result<(), Error> {
        self.move_coupled(time)?;
        self.place()?;
        self.lines.iter_mut().for_each(Line::initialize_nodes);

        state.clear();
        for kind in ObjectKind::CANONICAL {
            for slot in self.layout.free(kind) {
                let out = state.slice_mut(slot.offset, slot.len);
                self.object(kind, slot.index).initial_state(out)?;
            }
        }
        Ok(())
    }

    fn object(&self, kind: ObjectKind, index: usize) -> &dyn PhysicalObject {
        match kind {
            ObjectKind::Line => &self.lines[index],
            ObjectKind::Connection => &self.connections[index],
            ObjectKind::Rod => &self.rods[index],
            ObjectKind::Body => &self.bodies[index],
        }
    }

    fn object_mut(&mut self, kind: ObjectKind, index: usize) -> &mut dyn PhysicalObject {
        match kind {
            ObjectKind::Line => &mut self.lines[index],
            ObjectKind::Connection => &mut self.connections[index],
            ObjectKind::Rod => &mut self.rods[index],
            ObjectKind::Body => &mut self.bodies[index],
        }
    }

    fn set_free_states(&mut self, kind: ObjectKind, state: &StateVector) -> Result<(), Error> {
        for i in 0..self.layout.free(kind).len() {
            let slot = self.layout.free(kind)[i];
            self.object_mut(kind, slot.index).set_state(state.slice(slot.offset, slot.len))?;
        }
        Ok(())
    }

    /// Computes forces and masses of every object, leaves first.
    pub fn compute_forces(&mut self, time: f64) {
        for line in &mut self.lines {
            line.compute_forces(time, &self.waves, &self.env);
        }
        for connection in &mut self.connections {
            connection.compute_forces(&self.lines, &self.env);
        }
        for rod in &mut self.rods {
            rod.compute_forces(&self.lines, &self.env);
        }
        for body in &mut self.bodies {
            body.compute_forces(&self.connections, &self.rods, &self.env);
        }
    }

    /// Net loads on the coupled objects, in coupled-table order: six for
    /// bodies and cantilevered rods, three for pinned rods and connections.
    pub fn net_forces(&mut self, time: f64) -> Vec<f64> {
        self.compute_forces(time);

        let mut forces = Vec::with_capacity(self.layout.total_coupled_dof());
        for (kind, slot) in self.layout.coupled_order() {
            match kind {
                ObjectKind::Body => {
                    forces.extend_from_slice(self.bodies[slot.index].net_force().as_slice());
                }
                ObjectKind::Rod => {
                    let rod = &self.rods[slot.index];
                    forces.extend_from_slice(rod.net_force().as_slice());
                    if slot.dof == 6 {
                        forces.extend_from_slice(rod.net_moment().as_slice());
                    }
                }
                ObjectKind::Connection => {
                    forces.extend_from_slice(self.connections[slot.index].net_force().as_slice());
                }
                ObjectKind::Line => {}
            }
        }
        forces
    }

    /// Checks that every end of the given failures is still attached where
    /// it breaks from and is claimed once, so detaching cannot stop halfway.
    fn check_detachable(&self, failures: &[usize]) -> Result<(), Error> {
        let mut claimed = HashSet::new();
        for &k in failures {
            let failure = &self.failures[k];
            let from = &self.connections[failure.connection];
            for &end in &failure.ends {
                if !from.attached().contains(&end) || !claimed.insert(end) {
                    return Err(Error::invalid_state(format!(
                        "failure {} cannot detach line {} end {:?} from connection {}",
                        k + 1,
                        end.line + 1,
                        end.end,
                        failure.connection + 1
                    )));
                }
            }
        }
        Ok(())
    }

    /// Detaches the ends of failure `k`, each onto a new free connection.
    ///
    /// Returns the state slots of the new connections.
    pub fn trip(&mut self, k: usize) -> Result<Vec<Slot>, Error> {
        self.check_detachable(&[k])?;
        let failure = &self.failures[k];
        let (from, ends) = (failure.connection, failure.ends.clone());

        let mut slots = Vec::with_capacity(ends.len());
        for end in ends {
            self.connections[from].remove_line(end)?;

            let line = &self.lines[end.line];
            let index = self.connections.len();
            let slot = self.layout.append_free(ObjectKind::Connection, index, DETACHED_END_LEN)?;
            self.connections.push(Connection::detached(
                index + 1,
                end,
                line.end_position(end.end),
                line.end_velocity(end.end),
            ));

            tracing::warn!(
                line = end.line + 1,
                end = ?end.end,
                from = from + 1,
                connection = index + 1,
                offset = slot.offset,
                "line end detached"
            );
            slots.push(slot);
        }

        self.failures[k].mark_tripped();
        self.trip_log.push(k);
        Ok(slots)
    }

    /// Writes host kinematics of the coupled objects, in coupled-table order.
    pub fn write_coupled(&self, out: &mut Vec<u64>) {
        for (kind, slot) in self.layout.coupled_order() {
            match kind {
                ObjectKind::Body => self.bodies[slot.index].write_words(out),
                ObjectKind::Rod => self.rods[slot.index].write_words(out),
                ObjectKind::Connection => self.connections[slot.index].write_words(out),
                ObjectKind::Line => {}
            }
        }
    }

    pub fn read_coupled<'a>(&mut self, mut data: &'a [u64]) -> Result<&'a [u64], Error> {
        let order: Vec<_> = self.layout.coupled_order().collect();
        for (kind, slot) in order {
            data = match kind {
                ObjectKind::Body => self.bodies[slot.index].deserialize(data)?,
                ObjectKind::Rod => self.rods[slot.index].deserialize(data)?,
                ObjectKind::Connection => self.connections[slot.index].deserialize(data)?,
                ObjectKind::Line => data,
            };
        }
        Ok(data)
    }
}

impl Dynamics for Model {
    /// Coupled objects follow the host from the start of the coupling step,
    /// so their position depends on the absolute time only.
    fn update(&mut self, time: f64, _elapsed: f64, state: &StateVector) -> Result<(), Error> {
        self.move_coupled(time)?;
        self.set_free_states(ObjectKind::Body, state)?;
        self.set_free_states(ObjectKind::Rod, state)?;
        self.set_free_states(ObjectKind::Connection, state)?;
        self.place()?;
        self.set_free_states(ObjectKind::Line, state)
    }

    fn derivative(&mut self, time: f64, out: &mut StateVector) -> Result<(), Error> {
        self.compute_forces(time);

        out.clear();
        for kind in ObjectKind::CANONICAL {
            for slot in self.layout.free(kind) {
                self.object(kind, slot.index).state_deriv(out.slice_mut(slot.offset, slot.len))?;
            }
        }
        Ok(())
    }

    fn finalize_step(&mut self, time: f64, state: &mut StateVector) -> Result<(), Error> {
        let tripping: Vec<usize> = (0..self.failures.len())
            .filter(|&k| self.failures[k].should_trip(time, &self.lines))
            .collect();
        if tripping.is_empty() {
            return Ok(());
        }

        self.check_detachable(&tripping)?;
        let needed: usize = tripping
            .iter()
            .map(|&k| self.failures[k].ends.len() * DETACHED_END_LEN)
            .sum();
        if needed > self.layout.reserve_remaining() {
            return Err(Error::invalid_state(format!(
                "detaching needs {needed} state components, {} left",
                self.layout.reserve_remaining()
            )));
        }

        for k in tripping {
            for slot in self.trip(k)? {
                self.connections[slot.index].initial_state(state.slice_mut(slot.offset, slot.len))?;
            }
        }
        Ok(())
    }
}
