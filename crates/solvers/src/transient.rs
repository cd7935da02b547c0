//! The stepping engine.
//!
//! A [`TimeIntegrator`] advances any [`Dynamics`] implementation with one of
//! a closed set of [`Scheme`]s. Every scheme evaluates the dynamics stage by
//! stage, always refreshing geometry with [`Dynamics::update`] before asking
//! for the matching [`Dynamics::derivative`]:
//!
//! | Scheme | Order | Evaluations per step |
//! |---|---|---|
//! | `euler` | 1 | 1 |
//! | `heun` | 2 | 1 (2 on the first step) |
//! | `rk2` | 2 | 2 |
//! | `rk4` | 4 | 4 |
//! | `ab2`..`ab4` | 2..4 | 1 |
//! | `beulerN` | 1 | N |
//! | `midpointN` | 2 | N |
//!
//! # Example
//!
//! ```ignore
//! use hawser_solvers::transient::{self, TimeIntegrator};
//!
//! let mut engine = TimeIntegrator::from_name("rk4", system_len)?;
//! engine.state_mut().as_mut_slice().copy_from_slice(&initial);
//!
//! let solution = transient::integrate_unobserved(&mut engine, &mut system, 1e-3, 1000)?;
//! println!("t = {}", solution.time);
//! ```

mod action;
mod adams_bashforth;
mod euler;
mod event;
mod heun;
mod implicit;
mod integrator;
mod runge_kutta;
mod scheme;
mod solution;
mod stages;


pub use action::Action;
pub use event::Event;
pub use integrator::TimeIntegrator;
pub use scheme::{MAX_AB_ORDER, Scheme};
pub use solution::{Solution, Status};

use hawser_core::{Dynamics, Error, Observer};

/// Advances the engine by `steps` steps of size `dt`.
///
/// The observer receives an [`Event`] after each accepted step and may
/// return [`Action::StopEarly`] to end the run.
///
/// # Errors
///
/// Returns the first error raised by a step. Steps accepted before the
/// failure stay accepted.
pub fn integrate<D, Obs>(
    integrator: &mut TimeIntegrator,
    dynamics: &mut D,
    dt: f64,
    steps: usize,
    mut observer: Obs,
) -> Result<Solution, Error>
where
    D: Dynamics + ?Sized,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    for step in 1..=steps {
        let time = integrator.step(dynamics, dt)?;

        let event = Event {
            step,
            time,
            state: integrator.state(),
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(Solution {
                status: Status::StoppedByObserver,
                steps: step,
                time,
            });
        }
    }

    Ok(Solution {
        status: Status::Complete,
        steps,
        time: integrator.time(),
    })
}

/// Advances the engine without observation.
///
/// This is a convenience wrapper around [`integrate`] that discards events.
///
/// # Errors
///
/// Returns the first error raised by a step.
pub fn integrate_unobserved<D>(
    integrator: &mut TimeIntegrator,
    dynamics: &mut D,
    dt: f64,
    steps: usize,
) -> Result<Solution, Error>
where
    D: Dynamics + ?Sized,
{
    integrate(integrator, dynamics, dt, steps, ())
}
