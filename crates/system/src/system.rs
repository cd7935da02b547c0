use hawser_core::{Checkpoint, Dynamics, Error, StateVector, StepSize, WordReader};
use hawser_solvers::transient::TimeIntegrator;
use nalgebra::Vector3;
use uom::si::time::second;

use crate::{
    config::{InitialConditions, SystemConfig},
    model::Model,
    objects::{Body, Connection, Line, Rod},
    waves::WaveBuffer,
};

#[cfg(test)]
mod tests;

/// A mooring system coupled to a host simulation.
///
/// Every coupling step the host supplies the kinematics of the coupled
/// objects, the system integrates its free objects over the step with
/// internal steps no longer than `dt_m`, and the host reads back the loads
/// on the coupled objects.
///
/// Instances own all their state and can be driven from separate threads.
#[derive(Debug, Clone)]
pub struct MooringSystem {
    model: Model,
    engine: TimeIntegrator,
    step_size: StepSize,
    initial_conditions: InitialConditions,
}

impl MooringSystem {
    /// Builds a system from its description.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the description is
    /// inconsistent or the scheme or time step is invalid, and
    /// [`Error::OutOfMemory`] if the state buffers cannot be allocated.
    pub fn from_config(config: &SystemConfig) -> Result<Self, Error> {
        let step_size = StepSize::from_time(config.dt_m)?;
        config.initial_conditions.validate()?;
        let model = Model::build(config)?;
        let engine = TimeIntegrator::new(config.scheme, model.layout.allocated_len())?;

        tracing::debug!(
            scheme = %config.scheme,
            dt_m = %step_size,
            lines = model.lines.len(),
            connections = model.connections.len(),
            rods = model.rods.len(),
            bodies = model.bodies.len(),
            "built mooring system"
        );

        Ok(Self {
            model,
            engine,
            step_size,
            initial_conditions: config.initial_conditions,
        })
    }

    /// Parses a TOML description and builds the system.
    ///
    /// # Errors
    ///
    /// As [`MooringSystem::from_config`], plus
    /// [`Error::InvalidConfiguration`] for malformed TOML.
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        Self::from_config(&text.parse()?)
    }

    /// Sets the initial coupled kinematics and lays out the free objects.
    ///
    /// Lines start straight between their ends, at rest. Unless `skip_ic` is
    /// set they are then settled by dynamic relaxation (see
    /// [`InitialConditions`]); the clock stays where it was. Skip it when a
    /// checkpoint is about to be restored anyway.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the slices do not hold
    /// [`MooringSystem::total_coupled_dof`] components each, and any error
    /// raised while settling.
    pub fn init(&mut self, x: &[f64], xd: &[f64], skip_ic: bool) -> Result<(), Error> {
        let time = self.engine.time();
        self.model.set_coupled_kinematics(x, xd, time)?;
        self.model.initialize(time, self.engine.state_mut())?;
        if !skip_ic {
            self.settle(x)?;
        }
        self.model.update(time, 0.0, self.engine.state())?;

        tracing::info!(
            time,
            scheme = %self.engine.name(),
            free_dof = self.total_free_dof(),
            coupled_dof = self.total_coupled_dof(),
            "initialized mooring system"
        );
        Ok(())
    }

    /// Relaxes the free objects with boosted drag while the coupled objects
    /// hold still at `x`, then keeps only the settled state.
    ///
    /// Failure conditions are ignored while settling.
    fn settle(&mut self, x: &[f64]) -> Result<(), Error> {
        let ic = self.initial_conditions;
        let mut model = self.model.clone();
        model.failures.clear();
        model.env.drag_scale = ic.drag_factor;
        model.set_coupled_kinematics(x, &vec![0.0; x.len()], 0.0)?;

        let len = self.model.layout.allocated_len();
        let mut engine = TimeIntegrator::new(self.engine.scheme(), len)?;
        engine.state_mut().clone_from(self.engine.state());
        model.update(0.0, 0.0, engine.state())?;

        let (count, size) = self.step_size.subdivide(ic.dt.get::<second>());
        let max_time = ic.max_time.get::<second>();
        let mut tensions = model.end_tensions();
        let mut settled = false;
        while !settled && engine.time() < max_time {
            for _ in 0..count {
                engine.step(&mut model, size)?;
            }
            model.update(engine.time(), 0.0, engine.state())?;
            let latest = model.end_tensions();
            settled = latest
                .iter()
                .zip(&tensions)
                .all(|(now, before)| (now - before).abs() <= ic.threshold * now.abs());
            tensions = latest;
        }

        if settled {
            tracing::info!(time = engine.time(), "settled initial conditions");
        } else {
            tracing::warn!(
                max_time,
                threshold = ic.threshold,
                "initial conditions did not settle, starting from the last state"
            );
        }
        self.engine.state_mut().clone_from(engine.state());
        Ok(())
    }

    /// Records new host kinematics for the coupled objects and moves them
    /// there, without advancing time.
    ///
    /// [`MooringSystem::step`] does this itself; calling it directly lets the
    /// host read [`MooringSystem::net_forces`] for a new pose.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the slices do not hold
    /// [`MooringSystem::total_coupled_dof`] components each. Nothing changes
    /// in that case.
    pub fn set_external_kinematics(&mut self, x: &[f64], xd: &[f64]) -> Result<(), Error> {
        let time = self.engine.time();
        self.model.set_coupled_kinematics(x, xd, time)?;
        self.model.update(time, 0.0, self.engine.state())
    }

    /// Advances the system by one coupling step of `dt` seconds and returns
    /// the loads on the coupled objects (see [`MooringSystem::net_forces`]).
    ///
    /// The step is split into the fewest equal internal steps no longer than
    /// `dt_m`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a bad `dt` or mis-sized
    /// kinematics, before anything changes. Errors raised while integrating
    /// abort the coupling step; internal steps completed before the failure
    /// stay committed.
    pub fn step(&mut self, x: &[f64], xd: &[f64], dt: f64) -> Result<Vec<f64>, Error> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(Error::invalid_input(format!(
                "coupling step must be positive and finite, got {dt}"
            )));
        }
        self.model.set_coupled_kinematics(x, xd, self.engine.time())?;

        let (count, size) = self.step_size.subdivide(dt);
        for _ in 0..count {
            self.engine.step(&mut self.model, size)?;
        }

        tracing::trace!(time = self.engine.time(), substeps = count, "coupling step");
        Ok(self.net_forces())
    }

    /// Net loads on the coupled objects: bodies, then rods, then
    /// connections, each in id order. Bodies and cantilevered rods give a
    /// force and a moment, pinned rods and connections a force.
    pub fn net_forces(&mut self) -> Vec<f64> {
        self.model.net_forces(self.engine.time())
    }

    /// Number of used components of the global state vector.
    #[must_use]
    pub fn total_free_dof(&self) -> usize {
        self.model.layout.total_free_dof()
    }

    /// Number of components the host supplies per coupling step.
    #[must_use]
    pub fn total_coupled_dof(&self) -> usize {
        self.model.layout.total_coupled_dof()
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        self.engine.time()
    }

    #[must_use]
    pub fn engine(&self) -> &TimeIntegrator {
        &self.engine
    }

    #[must_use]
    pub fn state(&self) -> &StateVector {
        self.engine.state()
    }

    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.model.connections
    }

    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.model.lines
    }

    #[must_use]
    pub fn rods(&self) -> &[Rod] {
        &self.model.rods
    }

    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.model.bodies
    }

    /// Resets the wave buffer to still water at every line node.
    pub fn init_wave_buffer(&mut self) {
        let points = self.model.wave_point_count();
        self.model.waves.initialize(points);
        tracing::debug!(points, "initialized wave kinematics");
    }

    /// Hands over wave kinematics at [`MooringSystem::wave_points`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on a point count mismatch; the buffer
    /// is unchanged in that case.
    pub fn set_wave_sample(
        &mut self,
        velocity: &[Vector3<f64>],
        acceleration: &[Vector3<f64>],
        time: f64,
    ) -> Result<(), Error> {
        self.model.waves.set_sample(velocity, acceleration, time)
    }

    /// Current positions of the wave query points: every line node, line by
    /// line.
    #[must_use]
    pub fn wave_points(&self) -> Vec<Vector3<f64>> {
        self.model
            .lines
            .iter()
            .flat_map(|line| line.nodes().iter().copied())
            .collect()
    }

    #[must_use]
    pub fn waves(&self) -> &WaveBuffer {
        &self.model.waves
    }
}

/// Layout: the tripped failures in trip order, the used state size, the
/// engine, the start time of the coupling step, the host kinematics of every
/// coupled object and the wave buffer.
///
/// Restoring replays the detachments the checkpoint records before reading
/// the state, so a checkpoint taken after a failure restores into a freshly
/// built system.
impl Checkpoint for MooringSystem {
    fn write_words(&self, out: &mut Vec<u64>) {
        let model = &self.model;
        out.push(model.trip_log.len() as u64);
        out.extend(model.trip_log.iter().map(|&k| k as u64));
        out.push(model.layout.total_free_dof() as u64);
        self.engine.write_words(out);
        out.push(model.step_start.to_bits());
        model.write_coupled(out);
        model.waves.write_words(out);
    }

    fn deserialize<'a>(&mut self, data: &'a [u64]) -> Result<&'a [u64], Error> {
        let mut model = self.model.clone();
        let mut engine = self.engine.clone();
        let mut reader = WordReader::new(data);

        let trips = reader.count()?;
        let mut log = Vec::new();
        for _ in 0..trips {
            log.push(reader.count()?);
        }
        if !log.starts_with(&model.trip_log) {
            return Err(Error::invalid_input(
                "checkpoint does not extend this system's failure history",
            ));
        }
        for &k in &log[model.trip_log.len()..] {
            if model.failures.get(k).is_none_or(|f| f.is_tripped()) {
                return Err(Error::invalid_input(format!("checkpoint trips unknown failure {k}")));
            }
            model.trip(k)?;
        }

        let used = reader.count()?;
        if used != model.layout.total_free_dof() {
            return Err(Error::invalid_input(format!(
                "checkpoint uses {used} state components, system uses {}",
                model.layout.total_free_dof()
            )));
        }

        let mut reader = WordReader::new(engine.deserialize(reader.rest())?);
        model.step_start = reader.f64()?;
        let rest = model.read_coupled(reader.rest())?;
        let rest = model.waves.deserialize(rest)?;

        model.update(engine.time(), 0.0, engine.state())?;

        self.model = model;
        self.engine = engine;
        Ok(rest)
    }
}
