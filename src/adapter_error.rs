//! Configuration and state errors of the robot model adapters

use std::fmt;

use crate::kinematic_traits::SolverError;

/// Errors that make the adapter unusable until corrected: unknown names at
/// initialization, unresolvable frames after a state change, mismatched state.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterError {
    NotInitialized,
    UnknownGroup(String),
    UnknownFrame(String),
    UnknownJoint(String),
    /// The group has no kinematics solver attached.
    NoSolver(String),
    /// State was built for a different robot model than the adapter was initialized with.
    ModelMismatch { expected: String, found: String },
    WrongDof { expected: usize, found: usize },
    Solver(SolverError),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AdapterError::NotInitialized =>
                write!(f, "Adapter is not initialized"),
            AdapterError::UnknownGroup(group) =>
                write!(f, "Unknown planning group '{}'", group),
            AdapterError::UnknownFrame(frame) =>
                write!(f, "Unknown frame '{}'", frame),
            AdapterError::UnknownJoint(joint) =>
                write!(f, "Unknown joint '{}'", joint),
            AdapterError::NoSolver(group) =>
                write!(f, "No kinematics solver attached to group '{}'", group),
            AdapterError::ModelMismatch { expected, found } =>
                write!(f, "Robot state is for model '{}', adapter uses '{}'", found, expected),
            AdapterError::WrongDof { expected, found } =>
                write!(f, "Wrong number of joints: expected {}, found {}", expected, found),
            AdapterError::Solver(err) =>
                write!(f, "Kinematics solver error: {}", err),
        }
    }
}

impl std::error::Error for AdapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AdapterError::Solver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SolverError> for AdapterError {
    fn from(err: SolverError) -> Self {
        AdapterError::Solver(err)
    }
}
