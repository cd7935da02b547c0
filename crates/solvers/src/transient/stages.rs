use hawser_core::{Error, StateVector};

/// Stage buffers of a scheme.
///
/// `r[0]` is the accepted state; `r[1..]` are trial states used within a
/// step. `rd` holds derivatives: stage derivatives for Runge-Kutta schemes,
/// the most-recent-first history for Adams-Bashforth.
#[derive(Debug, PartialEq)]
pub(crate) struct Stages {
    /// Simulation time of `r[0]`.
    pub t: f64,

    /// Number of accepted steps.
    pub n_steps: usize,

    pub r: Vec<StateVector>,
    pub rd: Vec<StateVector>,
}

impl Stages {
    pub fn new(r_count: usize, rd_count: usize, len: usize) -> Result<Self, Error> {
        let alloc = |count: usize| -> Result<Vec<StateVector>, Error> {
            let mut stages = Vec::new();
            stages
                .try_reserve_exact(count)
                .map_err(|err| Error::out_of_memory(format!("cannot allocate stages: {err}")))?;
            for _ in 0..count {
                stages.push(StateVector::zeros(len)?);
            }
            Ok(stages)
        };

        Ok(Self {
            t: 0.0,
            n_steps: 0,
            r: alloc(r_count)?,
            rd: alloc(rd_count)?,
        })
    }

    /// Sets `r[target] = r[0] + rd[deriv] * delta`.
    ///
    /// # Panics
    ///
    /// Panics if `target` is zero.
    pub fn set_trial(&mut self, target: usize, deriv: usize, delta: f64) {
        assert!(target > 0, "the accepted stage is not a trial stage");
        let (accepted, trials) = self.r.split_at_mut(1);
        trials[target - 1].step_from(&accepted[0], &self.rd[deriv], delta);
    }

    /// Adds `rd[deriv] * delta` to the accepted stage.
    pub fn advance(&mut self, deriv: usize, delta: f64) {
        self.r[0].add_scaled(&self.rd[deriv], delta);
    }
}

impl Clone for Stages {
    fn clone(&self) -> Self {
        Self {
            t: self.t,
            n_steps: self.n_steps,
            r: self.r.clone(),
            rd: self.rd.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.t = source.t;
        self.n_steps = source.n_steps;
        self.r.clone_from(&source.r);
        self.rd.clone_from(&source.rd);
    }
}
