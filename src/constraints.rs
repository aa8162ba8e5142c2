//! Joint limits as declared by the robot description.

/// Position limits of a single joint variable. Continuous joints are unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    pub lower: f64,
    pub upper: f64,
}

impl JointLimits {
    pub const UNBOUNDED: JointLimits = JointLimits {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    pub fn new(lower: f64, upper: f64) -> Self {
        JointLimits { lower, upper }
    }

    pub fn is_bounded(&self) -> bool {
        self.lower.is_finite() || self.upper.is_finite()
    }

    /// True if the value is within limits, extended by margin on both sides.
    /// NaN is never within limits.
    pub fn contains(&self, value: f64, margin: f64) -> bool {
        value >= self.lower - margin && value <= self.upper + margin
    }

    /// Clamp the value into the limits.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.lower).min(self.upper)
    }
}

/// Limits of a whole joint group, in the order of the group's active joints.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub limits: Vec<JointLimits>,
}

impl Constraints {
    pub fn new(limits: Vec<JointLimits>) -> Self {
        Constraints { limits }
    }

    /// Index of the first joint that is out of limits, if any. Configuration of the
    /// wrong length is not checked here.
    pub fn first_violation(&self, joints: &[f64], margin: f64) -> Option<usize> {
        self.limits.iter()
            .zip(joints.iter())
            .position(|(limits, &value)| !limits.contains(value, margin))
    }

    pub fn compliant(&self, joints: &[f64], margin: f64) -> bool {
        joints.len() == self.limits.len() && self.first_violation(joints, margin).is_none()
    }

    pub fn filter(&self, solutions: &[Vec<f64>], margin: f64) -> Vec<Vec<f64>> {
        solutions.iter()
            .filter(|joints| self.compliant(joints, margin))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;
    use super::*;

    fn limits() -> Constraints {
        Constraints::new(vec![
            JointLimits::new(-PI, PI),
            JointLimits::new(0.0, PI / 2.0),
            JointLimits::UNBOUNDED,
        ])
    }

    #[test]
    fn test_within_limits() {
        assert!(limits().compliant(&[0.0, 0.5, 100.0], 0.0));
    }

    #[test]
    fn test_out_of_limits() {
        let limits = limits();
        assert!(!limits.compliant(&[0.0, -0.1, 0.0], 0.0));
        assert_eq!(limits.first_violation(&[4.0, -0.1, 0.0], 0.0), Some(0));
    }

    #[test]
    fn test_margin_extends_limits() {
        assert!(limits().compliant(&[0.0, -0.05, 0.0], 0.1));
    }

    #[test]
    fn test_nan_and_wrong_length() {
        let limits = limits();
        assert!(!limits.compliant(&[0.0, f64::NAN, 0.0], 0.0));
        assert!(!limits.compliant(&[f64::NAN, 0.5, 0.0], 0.0));
        assert!(!limits.compliant(&[0.0, 0.5], 0.0));
    }

    #[test]
    fn test_unbounded_does_not_accept_nan() {
        assert!(!JointLimits::UNBOUNDED.contains(f64::NAN, 0.0));
        assert!(!JointLimits::UNBOUNDED.is_bounded());
    }

    #[test]
    fn test_filter_solutions() {
        let solutions = vec![vec![0.0, 0.5, 1.0], vec![0.0, 2.0, 1.0]];
        let filtered = limits().filter(&solutions, 0.0);
        assert_eq!(filtered, vec![vec![0.0, 0.5, 1.0]]);
    }
}
