use hawser_core::{
    Checkpoint, Dynamics, Error, StateVector, WordReader,
    checkpoint::push_f64,
};

use super::{adams_bashforth, euler, heun, implicit, runge_kutta, scheme::Scheme, stages::Stages};

/// The stepping engine.
///
/// Owns the stage buffers of one [`Scheme`] and advances a [`Dynamics`]
/// implementation one step at a time. Each step works on a copy of the
/// stages; the copy replaces the accepted state only once every stage
/// evaluation and [`Dynamics::finalize_step`] succeeded, so a failing step
/// leaves the engine exactly as it was.
#[derive(Debug, Clone)]
pub struct TimeIntegrator {
    scheme: Scheme,
    accepted: Stages,
    trial: Stages,
}

impl TimeIntegrator {
    /// Creates an engine for a state vector of `len` components, at time 0
    /// with a zero state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the stage buffers cannot be
    /// allocated.
    pub fn new(scheme: Scheme, len: usize) -> Result<Self, Error> {
        let (r_count, rd_count) = scheme.stage_counts();
        let accepted = Stages::new(r_count, rd_count, len)?;
        let trial = Stages::new(r_count, rd_count, len)?;

        tracing::debug!(scheme = %scheme, len, "created {}", scheme.description());

        Ok(Self {
            scheme,
            accepted,
            trial,
        })
    }

    /// Creates an engine for a scheme selected by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for an unknown name (see
    /// [`Scheme::from_name`]) or [`Error::OutOfMemory`] if allocation fails.
    pub fn from_name(name: &str, len: usize) -> Result<Self, Error> {
        Self::new(Scheme::from_name(name)?, len)
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Human readable scheme description.
    #[must_use]
    pub fn name(&self) -> String {
        self.scheme.description()
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.accepted.t
    }

    pub fn set_time(&mut self, t: f64) {
        self.accepted.t = t;
    }

    /// Number of accepted steps.
    #[must_use]
    pub fn n_steps(&self) -> usize {
        self.accepted.n_steps
    }

    /// The accepted state.
    #[must_use]
    pub fn state(&self) -> &StateVector {
        &self.accepted.r[0]
    }

    /// The accepted state, for setting initial conditions.
    pub fn state_mut(&mut self) -> &mut StateVector {
        &mut self.accepted.r[0]
    }

    /// The derivative stages, most recent first for multistep schemes.
    #[must_use]
    pub fn derivatives(&self) -> &[StateVector] {
        &self.accepted.rd
    }

    /// Advances the accepted state by `dt` and returns the new time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `dt` is not a positive finite
    /// number, or whatever error the dynamics raise. On error nothing is
    /// committed.
    pub fn step<D: Dynamics + ?Sized>(&mut self, dynamics: &mut D, dt: f64) -> Result<f64, Error> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(Error::invalid_input(format!(
                "time step must be positive and finite, got {dt}"
            )));
        }

        self.trial.clone_from(&self.accepted);
        let s = &mut self.trial;

        match self.scheme {
            Scheme::Euler => euler::advance(s, dynamics, dt)?,
            Scheme::Heun => heun::advance(s, dynamics, dt)?,
            Scheme::Rk2 => runge_kutta::advance_rk2(s, dynamics, dt)?,
            Scheme::Rk4 => runge_kutta::advance_rk4(s, dynamics, dt)?,
            Scheme::AdamsBashforth { order } => adams_bashforth::advance(s, dynamics, dt, order)?,
            Scheme::Implicit { iterations, factor } => {
                implicit::advance(s, dynamics, dt, iterations, factor)?;
            }
        }

        dynamics.finalize_step(s.t, &mut s.r[0])?;
        s.n_steps += 1;

        std::mem::swap(&mut self.accepted, &mut self.trial);
        Ok(self.accepted.t)
    }
}

/// Packs time, step count and every stage buffer.
///
/// Layout: `t`, `n_steps`, number of `r` stages, each `r` stage as a
/// length-prefixed block, number of `rd` stages, each `rd` stage likewise.
impl Checkpoint for TimeIntegrator {
    fn write_words(&self, out: &mut Vec<u64>) {
        let s = &self.accepted;
        push_f64(out, s.t);
        out.push(s.n_steps as u64);
        for stages in [&s.r, &s.rd] {
            out.push(stages.len() as u64);
            for stage in stages {
                stage.write_words(out);
            }
        }
    }

    fn deserialize<'a>(&mut self, data: &'a [u64]) -> Result<&'a [u64], Error> {
        let mut restored = self.accepted.clone();
        let mut reader = WordReader::new(data);

        restored.t = reader.f64()?;
        restored.n_steps = reader.count()?;

        let mut rest = reader.rest();
        for stages in [&mut restored.r, &mut restored.rd] {
            let mut reader = WordReader::new(rest);
            let count = reader.count()?;
            if count != stages.len() {
                return Err(Error::invalid_input(format!(
                    "checkpoint holds {count} stages, {} expects {}",
                    self.scheme,
                    stages.len()
                )));
            }
            rest = reader.rest();
            for stage in stages.iter_mut() {
                rest = stage.deserialize(rest)?;
            }
        }

        self.accepted = restored;
        Ok(rest)
    }
}
