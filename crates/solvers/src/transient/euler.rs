//! Explicit Euler.
//!
//! ```text
//! r_{n+1} = r_n + ṙ_n · dt
//! ```

use hawser_core::{Dynamics, Error};

use super::stages::Stages;

pub(super) fn advance<D: Dynamics + ?Sized>(
    s: &mut Stages,
    dynamics: &mut D,
    dt: f64,
) -> Result<(), Error> {
    let t0 = s.t;

    dynamics.update(t0, 0.0, &s.r[0])?;
    dynamics.derivative(t0, &mut s.rd[0])?;
    s.advance(0, dt);

    s.t = t0 + dt;
    dynamics.update(s.t, dt, &s.r[0])
}
