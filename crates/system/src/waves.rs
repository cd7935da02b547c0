//! Two-sample buffer of externally supplied wave kinematics.
//!
//! The host evaluates its wave model at the line nodes (see
//! [`crate::MooringSystem::wave_points`]) once per coupling step and hands
//! the samples over with [`WaveBuffer::set_sample`]. Lines then read the flow
//! at any stage time by linear interpolation between the two most recent
//! samples. Queries outside the bracket are extrapolated from the same two
//! samples, however stale they are.

use hawser_core::{Checkpoint, Error, WordReader, checkpoint::push_f64};
use nalgebra::Vector3;

/// One time-stamped snapshot of flow velocity and acceleration per point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveSample {
    pub time: f64,
    pub velocity: Vec<Vector3<f64>>,
    pub acceleration: Vec<Vector3<f64>>,
}

impl WaveSample {
    fn zeros(points: usize) -> Self {
        Self {
            time: 0.0,
            velocity: vec![Vector3::zeros(); points],
            acceleration: vec![Vector3::zeros(); points],
        }
    }
}

/// Holds the latest wave sample and the one before it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveBuffer {
    points: usize,
    current: WaveSample,
    previous: WaveSample,
}

impl WaveBuffer {
    /// Creates a buffer for `points` query points, both samples zero at time 0.
    #[must_use]
    pub fn new(points: usize) -> Self {
        Self {
            points,
            current: WaveSample::zeros(points),
            previous: WaveSample::zeros(points),
        }
    }

    /// Resets both samples to zero at time 0 for `points` query points.
    pub fn initialize(&mut self, points: usize) {
        *self = Self::new(points);
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points
    }

    /// The most recently set sample.
    #[must_use]
    pub fn current(&self) -> &WaveSample {
        &self.current
    }

    /// The sample set before [`WaveBuffer::current`].
    #[must_use]
    pub fn previous(&self) -> &WaveSample {
        &self.previous
    }

    /// Stores a new sample, shifting the current one into the previous slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if either slice does not hold exactly
    /// one value per query point. The buffer is unchanged in that case.
    pub fn set_sample(
        &mut self,
        velocity: &[Vector3<f64>],
        acceleration: &[Vector3<f64>],
        time: f64,
    ) -> Result<(), Error> {
        if velocity.len() != self.points || acceleration.len() != self.points {
            return Err(Error::invalid_input(format!(
                "wave sample holds {} velocities and {} accelerations, expected {} points",
                velocity.len(),
                acceleration.len(),
                self.points
            )));
        }

        std::mem::swap(&mut self.previous, &mut self.current);
        self.current.time = time;
        self.current.velocity.clear();
        self.current.velocity.extend_from_slice(velocity);
        self.current.acceleration.clear();
        self.current.acceleration.extend_from_slice(acceleration);
        Ok(())
    }

    /// Flow velocity and acceleration at `point` and `time`.
    ///
    /// Returns `None` if `point` is out of range.
    #[must_use]
    pub fn query(&self, point: usize, time: f64) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let (current, previous) = (&self.current, &self.previous);
        let (u1, ud1) = (current.velocity.get(point)?, current.acceleration.get(point)?);
        let (u2, ud2) = (previous.velocity.get(point)?, previous.acceleration.get(point)?);

        let span = self.current.time - self.previous.time;
        if span == 0.0 {
            return Some((*u1, *ud1));
        }

        let w = (time - self.previous.time) / span;
        Some((u2 + (u1 - u2) * w, ud2 + (ud1 - ud2) * w))
    }
}

fn push_vectors(out: &mut Vec<u64>, values: &[Vector3<f64>]) {
    for v in values {
        out.extend(v.iter().map(|x| x.to_bits()));
    }
}

fn read_vectors(reader: &mut WordReader<'_>, out: &mut [Vector3<f64>]) -> Result<(), Error> {
    for v in out {
        let mut xyz = [0.0; 3];
        reader.f64s(&mut xyz)?;
        *v = Vector3::from(xyz);
    }
    Ok(())
}

/// Layout: point count, then the current and previous samples as time,
/// velocities and accelerations.
impl Checkpoint for WaveBuffer {
    fn write_words(&self, out: &mut Vec<u64>) {
        out.push(self.points as u64);
        for sample in [&self.current, &self.previous] {
            push_f64(out, sample.time);
            push_vectors(out, &sample.velocity);
            push_vectors(out, &sample.acceleration);
        }
    }

    fn deserialize<'a>(&mut self, data: &'a [u64]) -> Result<&'a [u64], Error> {
        let mut reader = WordReader::new(data);
        let points = reader.count()?;
        if points != self.points {
            return Err(Error::invalid_input(format!(
                "checkpoint holds wave kinematics for {points} points, expected {}",
                self.points
            )));
        }

        let mut restored = self.clone();
        for sample in [&mut restored.current, &mut restored.previous] {
            sample.time = reader.f64()?;
            read_vectors(&mut reader, &mut sample.velocity)?;
            read_vectors(&mut reader, &mut sample.acceleration)?;
        }

        *self = restored;
        Ok(reader.rest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn uniform(points: usize, x: f64) -> Vec<Vector3<f64>> {
        vec![Vector3::new(x, 0.0, 0.0); points]
    }

    #[test]
    fn new_samples_shift_the_current_one() {
        let mut waves = WaveBuffer::new(5);
        let (ua, uda) = (uniform(5, 1.0), uniform(5, 0.1));
        let (ub, udb) = (uniform(5, 2.0), uniform(5, 0.2));

        waves.set_sample(&ua, &uda, 1.0).unwrap();
        waves.set_sample(&ub, &udb, 2.0).unwrap();

        let previous = waves.previous();
        assert_relative_eq!(previous.time, 1.0);
        assert_eq!(previous.velocity, ua);
        assert_eq!(previous.acceleration, uda);

        let current = waves.current();
        assert_relative_eq!(current.time, 2.0);
        assert_eq!(current.velocity, ub);
        assert_eq!(current.acceleration, udb);
    }

    #[test]
    fn mismatched_sample_leaves_buffer_unchanged() {
        let mut waves = WaveBuffer::new(5);
        waves.set_sample(&uniform(5, 1.0), &uniform(5, 0.0), 1.0).unwrap();
        let before = waves.clone();

        let err = waves.set_sample(&uniform(3, 9.0), &uniform(3, 9.0), 2.0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(waves, before);

        let err = waves.set_sample(&uniform(5, 9.0), &uniform(4, 9.0), 2.0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(waves, before);
    }

    #[test]
    fn query_interpolates_and_extrapolates() {
        let mut waves = WaveBuffer::new(2);
        waves.set_sample(&uniform(2, 1.0), &uniform(2, 0.0), 1.0).unwrap();
        waves.set_sample(&uniform(2, 3.0), &uniform(2, 4.0), 2.0).unwrap();

        let (u, ud) = waves.query(1, 1.5).unwrap();
        assert_relative_eq!(u.x, 2.0);
        assert_relative_eq!(ud.x, 2.0);

        // No staleness guard: far outside the bracket the line keeps going.
        let (u, _) = waves.query(0, 10.0).unwrap();
        assert_relative_eq!(u.x, 19.0);

        assert!(waves.query(2, 1.5).is_none());
    }

    #[test]
    fn equal_sample_times_return_latest() {
        let mut waves = WaveBuffer::new(1);
        waves.set_sample(&uniform(1, 1.0), &uniform(1, 0.0), 3.0).unwrap();
        waves.set_sample(&uniform(1, 5.0), &uniform(1, 0.0), 3.0).unwrap();

        let (u, _) = waves.query(0, 7.0).unwrap();
        assert_relative_eq!(u.x, 5.0);
    }

    #[test]
    fn initialize_resets_to_zero() {
        let mut waves = WaveBuffer::new(2);
        waves.set_sample(&uniform(2, 1.0), &uniform(2, 1.0), 4.0).unwrap();

        waves.initialize(3);

        assert_eq!(waves.point_count(), 3);
        assert_eq!(waves.current(), &WaveSample::zeros(3));
        assert_eq!(waves.previous(), &WaveSample::zeros(3));
    }

    #[test]
    fn checkpoint_round_trip() {
        let mut waves = WaveBuffer::new(2);
        waves.set_sample(&uniform(2, 0.3), &uniform(2, -0.7), 0.1).unwrap();
        waves.set_sample(&uniform(2, 1.3), &uniform(2, 2.7), 0.2).unwrap();

        let mut words = waves.serialize();
        assert_eq!(words.len(), 1 + 2 * (1 + 2 * 2 * 3));
        words.push(42);

        let mut restored = WaveBuffer::new(2);
        let rest = restored.deserialize(&words).unwrap();
        assert_eq!(rest, &[42]);
        assert_eq!(restored, waves);

        let mut wrong = WaveBuffer::new(3);
        assert!(wrong.deserialize(&words).is_err());
    }
}
