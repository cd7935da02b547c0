//! Adams-Bashforth multistep schemes.
//!
//! The derivative history is kept most-recent first. Each step shifts the
//! history by one slot (dropping the oldest), stores the new derivative in
//! slot 0 and applies the formula of the highest order the history supports:
//!
//! ```text
//! r_{n+1} = r_n + dt · Σ_i c_i · ṙ_{n-i}
//! ```

use hawser_core::{Dynamics, Error};

use super::stages::Stages;

/// Coefficients of AB1 (Euler) to AB4, most recent derivative first.
pub(crate) const COEFFICIENTS: [&[f64]; 4] = [
    &[1.0],
    &[3.0 / 2.0, -1.0 / 2.0],
    &[23.0 / 12.0, -4.0 / 3.0, 5.0 / 12.0],
    &[55.0 / 24.0, -59.0 / 24.0, 37.0 / 24.0, -3.0 / 8.0],
];

/// Coefficients used on a step with `n_steps` accepted steps behind it.
pub(crate) fn coefficients(order: usize, n_steps: usize) -> &'static [f64] {
    COEFFICIENTS[n_steps.min(order - 1)]
}

pub(super) fn advance<D: Dynamics + ?Sized>(
    s: &mut Stages,
    dynamics: &mut D,
    dt: f64,
    order: usize,
) -> Result<(), Error> {
    let t0 = s.t;

    dynamics.update(t0, 0.0, &s.r[0])?;

    // The oldest derivative rotates into slot 0 and is overwritten.
    s.rd.rotate_right(1);
    dynamics.derivative(t0, &mut s.rd[0])?;

    for (i, c) in coefficients(order, s.n_steps).iter().enumerate() {
        s.advance(i, c * dt);
    }

    s.t = t0 + dt;
    dynamics.update(s.t, dt, &s.r[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn coefficients_sum_to_one() {
        for table in COEFFICIENTS {
            assert_relative_eq!(table.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn order_grows_with_history() {
        assert_eq!(coefficients(4, 0).len(), 1);
        assert_eq!(coefficients(4, 1).len(), 2);
        assert_eq!(coefficients(4, 2).len(), 3);
        assert_eq!(coefficients(4, 3).len(), 4);
        assert_eq!(coefficients(4, 100).len(), 4);
        assert_eq!(coefficients(2, 100).len(), 2);
    }
}
