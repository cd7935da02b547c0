//! Heun predictor-corrector.
//!
//! The derivative evaluated at the end of one step is reused as the
//! predictor slope of the next, so a warm step costs a single evaluation:
//!
//! ```text
//! r*      = r_n + ṙ_prev · dt
//! ṙ_new   = f(t_n + dt, r*)
//! r_{n+1} = r* + (ṙ_new − ṙ_prev) · dt/2
//! ```
//!
//! On the first step there is no previous slope, so it is evaluated at `r_n`.

use hawser_core::{Dynamics, Error};

use super::stages::Stages;

pub(super) fn advance<D: Dynamics + ?Sized>(
    s: &mut Stages,
    dynamics: &mut D,
    dt: f64,
) -> Result<(), Error> {
    let t0 = s.t;

    if s.n_steps == 0 {
        dynamics.update(t0, 0.0, &s.r[0])?;
        dynamics.derivative(t0, &mut s.rd[0])?;
    }

    // Predict with the previous slope and keep it for the correction.
    s.advance(0, dt);
    let (latest, previous) = s.rd.split_at_mut(1);
    previous[0].clone_from(&latest[0]);

    s.t = t0 + dt;
    dynamics.update(s.t, dt, &s.r[0])?;
    dynamics.derivative(s.t, &mut s.rd[0])?;

    s.advance(0, 0.5 * dt);
    s.advance(1, -0.5 * dt);
    dynamics.update(s.t, dt, &s.r[0])
}
