use std::ops::{Index, IndexMut};

use crate::Error;

/// The global state vector, or one stage of it.
///
/// The vector has a fixed allocated length that includes the space reserved
/// for objects created mid-run. Components past the used size stay zero until
/// a new object claims them, so the affine operations always run over the
/// whole allocation.
#[derive(Debug, PartialEq)]
pub struct StateVector {
    values: Vec<f64>,
}

impl StateVector {
    /// Allocates a zeroed vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the allocation fails.
    pub fn zeros(len: usize) -> Result<Self, Error> {
        let mut values = Vec::new();
        values.try_reserve_exact(len).map_err(|err| {
            Error::out_of_memory(format!("cannot allocate {len} state components: {err}"))
        })?;
        values.resize(len, 0.0);
        Ok(Self { values })
    }

    #[must_use]
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Returns the `len` components starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[must_use]
    pub fn slice(&self, offset: usize, len: usize) -> &[f64] {
        &self.values[offset..offset + len]
    }

    /// Returns the `len` components starting at `offset`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [f64] {
        &mut self.values[offset..offset + len]
    }

    /// Sets every component to zero.
    pub fn clear(&mut self) {
        self.values.fill(0.0);
    }

    /// Overwrites `self` with `base + derivative * delta`.
    pub fn step_from(&mut self, base: &StateVector, derivative: &StateVector, delta: f64) {
        debug_assert_eq!(self.len(), base.len());
        debug_assert_eq!(self.len(), derivative.len());
        for ((out, x), d) in self.values.iter_mut().zip(&base.values).zip(&derivative.values) {
            *out = x + d * delta;
        }
    }

    /// Adds `derivative * scale` to `self` in place.
    pub fn add_scaled(&mut self, derivative: &StateVector, scale: f64) {
        debug_assert_eq!(self.len(), derivative.len());
        for (out, d) in self.values.iter_mut().zip(&derivative.values) {
            *out += d * scale;
        }
    }
}

impl Clone for StateVector {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
        }
    }

    // Reuses the existing allocation; the engine copies stages every step.
    fn clone_from(&mut self, source: &Self) {
        self.values.clone_from(&source.values);
    }
}

impl Index<usize> for StateVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}

impl IndexMut<usize> for StateVector {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.values[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn step_from_overwrites_target() {
        let base = StateVector::from_vec(vec![1.0, -1.0]);
        let deriv = StateVector::from_vec(vec![4.0, 2.0]);
        let mut out = StateVector::from_vec(vec![99.0, 99.0]);

        out.step_from(&base, &deriv, 0.5);

        assert_relative_eq!(out[0], 3.0);
        assert_relative_eq!(out[1], 0.0);
    }

    #[test]
    fn add_scaled_accumulates() {
        let mut x = StateVector::from_vec(vec![1.0, 1.0]);
        let a = StateVector::from_vec(vec![1.0, 2.0]);
        let b = StateVector::from_vec(vec![3.0, 4.0]);

        x.add_scaled(&a, 2.0);
        x.add_scaled(&b, -1.0);

        assert_eq!(x.as_slice(), &[0.0, 1.0]);
    }

    #[test]
    fn zeros_allocates_requested_length() {
        let x = StateVector::zeros(12).unwrap();
        assert_eq!(x.len(), 12);
        assert!(x.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn clone_from_reuses_allocation() {
        let source = StateVector::from_vec(vec![1.0, 2.0, 3.0]);
        let mut target = StateVector::zeros(3).unwrap();
        let before = target.as_slice().as_ptr();

        target.clone_from(&source);

        assert_eq!(target, source);
        assert_eq!(target.as_slice().as_ptr(), before);
    }

    #[test]
    fn slices_address_object_ranges() {
        let mut x = StateVector::zeros(6).unwrap();
        x.slice_mut(2, 3).copy_from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(x.slice(1, 4), &[0.0, 1.0, 2.0, 3.0]);
    }
}
