//! Fixed-point implicit Euler family.
//!
//! With blend factor `k`, every iteration evaluates
//!
//! ```text
//! ṙ ← f(t + k·dt, r_n + ṙ · k·dt)
//! ```
//!
//! and the step is committed as `r_{n+1} = r_n + ṙ · dt`. The first
//! iteration starts from the derivative kept from the previous step.

use hawser_core::{Dynamics, Error};

use super::stages::Stages;

pub(super) fn advance<D: Dynamics + ?Sized>(
    s: &mut Stages,
    dynamics: &mut D,
    dt: f64,
    iterations: usize,
    factor: f64,
) -> Result<(), Error> {
    let t0 = s.t;
    let blended = factor * dt;

    for _ in 0..iterations {
        s.set_trial(1, 0, blended);
        dynamics.update(t0 + blended, blended, &s.r[1])?;
        dynamics.derivative(t0 + blended, &mut s.rd[0])?;
    }

    s.advance(0, dt);
    s.t = t0 + dt;
    dynamics.update(s.t, dt, &s.r[0])
}
