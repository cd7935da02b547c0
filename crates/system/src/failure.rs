use crate::objects::{Line, LineEnd};

/// A rule that breaks line ends loose from a connection.
///
/// The condition trips once, at the end of the first step where the
/// simulation time reaches `time` or the tension at any listed end exceeds
/// `tension_threshold`. Every listed end then detaches together.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureCondition {
    /// Index of the connection the ends break from.
    pub connection: usize,

    /// The line ends that detach.
    pub ends: Vec<LineEnd>,

    pub tension_threshold: f64,

    pub time: f64,

    tripped: bool,
}

impl FailureCondition {
    #[must_use]
    pub fn new(connection: usize, ends: Vec<LineEnd>, tension_threshold: f64, time: f64) -> Self {
        Self {
            connection,
            ends,
            tension_threshold,
            time,
            tripped: false,
        }
    }

    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub(crate) fn mark_tripped(&mut self) {
        self.tripped = true;
    }

    /// Whether the condition trips at `time` given the current line geometry.
    #[must_use]
    pub fn should_trip(&self, time: f64, lines: &[Line]) -> bool {
        if self.tripped {
            return false;
        }
        time >= self.time
            || self
                .ends
                .iter()
                .any(|end| lines[end.line].end_tension(end.end) > self.tension_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::Vector3;

    use crate::objects::{End, LineProps};

    fn taut_line(stretch: f64) -> Line {
        let props = LineProps {
            diameter: 0.1,
            mass_per_length: 10.0,
            ea: 1.0e6,
            damping: 0.0,
            cd: 0.0,
            cdt: 0.0,
            ca: 0.0,
        };
        let mut line = Line::new(1, 2, 10.0, props, 0).unwrap();
        line.set_end_kinematics(End::A, Vector3::zeros(), Vector3::zeros());
        line.set_end_kinematics(End::B, Vector3::new(10.0 + stretch, 0.0, 0.0), Vector3::zeros());
        line.initialize_nodes();
        line
    }

    #[test]
    fn trips_on_time() {
        let end = LineEnd { line: 0, end: End::B };
        let failure = FailureCondition::new(0, vec![end], f64::INFINITY, 5.0);
        let lines = [taut_line(0.0)];

        assert!(!failure.should_trip(4.9, &lines));
        assert!(failure.should_trip(5.0, &lines));
    }

    #[test]
    fn trips_on_tension() {
        let end = LineEnd { line: 0, end: End::B };
        let failure = FailureCondition::new(0, vec![end], 5.0e4, f64::INFINITY);

        // Strain 0.01 gives 1e4 N, strain 0.1 gives 1e5 N.
        assert!(!failure.should_trip(0.0, &[taut_line(0.1)]));
        assert!(failure.should_trip(0.0, &[taut_line(1.0)]));
    }

    #[test]
    fn trips_only_once() {
        let end = LineEnd { line: 0, end: End::A };
        let mut failure = FailureCondition::new(0, vec![end], f64::INFINITY, 0.0);
        let lines = [taut_line(0.0)];

        assert!(failure.should_trip(1.0, &lines));
        failure.mark_tripped();
        assert!(!failure.should_trip(2.0, &lines));
        assert!(failure.is_tripped());
    }
}
