//! Decides whether a joint configuration is usable: no NaN, within joint limits and
//! free of disallowed collisions.

use std::fmt;

use crate::collisions::{CollisionContext, RobotBody};
use crate::constraints::JointLimits;
use crate::robot_model::JointGroup;
use crate::robot_state::RobotState;

/// Reason a configuration is not valid. Only the first failing check is reported.
#[derive(Debug, Clone, PartialEq)]
pub enum Invalid {
    WrongDof { expected: usize, found: usize },
    NaN { joint: usize },
    OutOfLimits { joint: usize, value: f64, limits: JointLimits },
    Collision { pairs: Vec<(String, String)> },
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Invalid::WrongDof { expected, found } =>
                write!(f, "{} joint values given, group has {}", found, expected),
            Invalid::NaN { joint } =>
                write!(f, "joint {} is NaN", joint),
            Invalid::OutOfLimits { joint, value, limits } =>
                write!(f, "joint {} at {} outside [{}, {}]", joint, value, limits.lower, limits.upper),
            Invalid::Collision { pairs } =>
                write!(f, "collision between {}", pairs.iter()
                    .map(|(a, b)| format!("'{}' and '{}'", a, b))
                    .collect::<Vec<_>>().join(", ")),
        }
    }
}

/// True if any of the values is NaN.
pub fn has_nan(joints: &[f64]) -> bool {
    joints.iter().any(|v| v.is_nan())
}

/// Read only view over everything validity depends on. Checking never modifies the
/// state it was built from.
pub struct SolutionValidator<'a> {
    pub state: &'a RobotState,
    pub group: &'a JointGroup,
    pub body: &'a RobotBody,
    pub context: &'a CollisionContext,
    pub limit_margin: f64,
}

impl SolutionValidator<'_> {
    pub fn check(&self, joints: &[f64]) -> Result<(), Invalid> {
        self.check_joints(joints)?;
        let pairs = self.detect(joints, true);
        if pairs.is_empty() {
            Ok(())
        } else {
            Err(Invalid::Collision { pairs })
        }
    }

    pub fn is_valid(&self, joints: &[f64]) -> bool {
        self.check(joints).is_ok()
    }

    /// All disallowed colliding pairs, sorted. Empty for configurations that cannot be
    /// placed (wrong length or NaN).
    pub fn collision_pairs(&self, joints: &[f64]) -> Vec<(String, String)> {
        if joints.len() != self.group.dof() || has_nan(joints) {
            return Vec::new();
        }
        self.detect(joints, false)
    }

    fn check_joints(&self, joints: &[f64]) -> Result<(), Invalid> {
        if joints.len() != self.group.dof() {
            return Err(Invalid::WrongDof { expected: self.group.dof(), found: joints.len() });
        }
        if let Some(joint) = joints.iter().position(|v| v.is_nan()) {
            return Err(Invalid::NaN { joint });
        }
        if let Some(joint) = self.group.constraints.first_violation(joints, self.limit_margin) {
            return Err(Invalid::OutOfLimits {
                joint,
                value: joints[joint],
                limits: self.group.constraints.limits[joint],
            });
        }
        Ok(())
    }

    fn detect(&self, joints: &[f64], first_collision_only: bool) -> Vec<(String, String)> {
        let mut scratch = self.state.clone();
        if scratch.set_group_positions(self.group, joints).is_err() {
            return Vec::new();
        }
        self.body.detect_collisions(scratch.link_transforms(), self.context, first_collision_only)
    }
}
