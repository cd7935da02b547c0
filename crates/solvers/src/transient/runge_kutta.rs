//! Explicit Runge-Kutta schemes.

use hawser_core::{Dynamics, Error};

use super::stages::Stages;

/// Midpoint rule: the full step uses the slope at `t + dt/2`.
pub(super) fn advance_rk2<D: Dynamics + ?Sized>(
    s: &mut Stages,
    dynamics: &mut D,
    dt: f64,
) -> Result<(), Error> {
    let t0 = s.t;
    let half = 0.5 * dt;

    dynamics.update(t0, 0.0, &s.r[0])?;
    dynamics.derivative(t0, &mut s.rd[0])?;

    s.set_trial(1, 0, half);
    dynamics.update(t0 + half, half, &s.r[1])?;
    dynamics.derivative(t0 + half, &mut s.rd[0])?;

    s.advance(0, dt);
    s.t = t0 + dt;
    dynamics.update(s.t, dt, &s.r[0])
}

/// Classic fourth-order Runge-Kutta.
///
/// ```text
/// k1 = f(t,        r)
/// k2 = f(t + dt/2, r + k1·dt/2)
/// k3 = f(t + dt/2, r + k2·dt/2)
/// k4 = f(t + dt,   r + k3·dt)
/// r ← r + (k1 + k4)·dt/6 + (k2 + k3)·dt/3
/// ```
pub(super) fn advance_rk4<D: Dynamics + ?Sized>(
    s: &mut Stages,
    dynamics: &mut D,
    dt: f64,
) -> Result<(), Error> {
    let t0 = s.t;
    let half = 0.5 * dt;

    // k1
    dynamics.update(t0, 0.0, &s.r[0])?;
    dynamics.derivative(t0, &mut s.rd[0])?;

    // k2
    s.set_trial(1, 0, half);
    dynamics.update(t0 + half, half, &s.r[1])?;
    dynamics.derivative(t0 + half, &mut s.rd[1])?;

    // k3
    s.set_trial(1, 1, half);
    dynamics.update(t0 + half, half, &s.r[1])?;
    dynamics.derivative(t0 + half, &mut s.rd[2])?;

    // k4
    s.set_trial(2, 2, dt);
    dynamics.update(t0 + dt, dt, &s.r[2])?;
    dynamics.derivative(t0 + dt, &mut s.rd[3])?;

    s.advance(0, dt / 6.0);
    s.advance(3, dt / 6.0);
    s.advance(1, dt / 3.0);
    s.advance(2, dt / 3.0);

    s.t = t0 + dt;
    dynamics.update(s.t, dt, &s.r[0])
}
