use std::fmt;

use thiserror::Error;
use uom::{
    Conversion,
    si::{f64::Time, time},
};

use crate::Error as CoreError;

/// A unit-safe, strictly positive internal time step.
///
/// A coupling step requested by the host is split into the smallest number
/// of equal internal steps that are no longer than this size.
///
/// ```ignore
/// use hawser_core::StepSize;
/// use uom::si::time::millisecond;
///
/// let dt = StepSize::new::<millisecond>(1.0)?;
/// assert_eq!(dt.subdivide(0.0105), (11, 0.0105 / 11.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct StepSize(Time);

/// Error returned when constructing an invalid [`StepSize`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StepSizeError {
    #[error("step size must be finite and greater than zero, got {0} s")]
    NotPositive(f64),
}

impl StepSize {
    /// Constructs a `StepSize` from a numeric value and unit.
    ///
    /// # Errors
    ///
    /// Returns [`StepSizeError::NotPositive`] if `value` is zero, negative or
    /// not finite.
    pub fn new<U>(value: f64) -> Result<Self, StepSizeError>
    where
        U: time::Unit + Conversion<f64, T = f64>,
    {
        Self::from_time(Time::new::<U>(value))
    }

    /// Constructs a `StepSize` from an existing [`Time`] value.
    ///
    /// # Errors
    ///
    /// Returns [`StepSizeError::NotPositive`] if the time is zero, negative
    /// or not finite.
    pub fn from_time(time: Time) -> Result<Self, StepSizeError> {
        let seconds = time.get::<time::second>();
        if seconds.is_finite() && seconds > 0.0 {
            Ok(Self(time))
        } else {
            Err(StepSizeError::NotPositive(seconds))
        }
    }

    #[must_use]
    pub fn seconds(&self) -> f64 {
        self.0.get::<time::second>()
    }

    #[must_use]
    pub fn into_inner(self) -> Time {
        self.0
    }

    /// Splits `interval` seconds into equal steps no longer than `self`.
    ///
    /// Returns the number of steps (at least one) and their size.
    #[must_use]
    pub fn subdivide(&self, interval: f64) -> (usize, f64) {
        let ratio = (interval / self.seconds()).ceil();
        // Truncation is fine: a ratio this large would never finish anyway.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = if ratio.is_finite() && ratio >= 1.0 {
            ratio as usize
        } else {
            1
        };
        #[allow(clippy::cast_precision_loss)]
        let size = interval / count as f64;
        (count, size)
    }
}

impl TryFrom<Time> for StepSize {
    type Error = StepSizeError;

    fn try_from(t: Time) -> Result<Self, Self::Error> {
        Self::from_time(t)
    }
}

impl From<StepSizeError> for CoreError {
    fn from(err: StepSizeError) -> Self {
        CoreError::invalid_configuration(err.to_string())
    }
}

impl fmt::Display for StepSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} s", self.seconds())
    }
}
