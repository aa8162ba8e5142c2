//! Error handling for robot description and configuration loading

use std::io;

/// Unified error to report failures while reading URDF, SRDF and YAML configuration.
#[derive(Debug)]
pub enum ParameterError {
    IoError(io::Error),
    ParseError(String),
    MissingField(String),
    WrongAngle(String),
    InvalidLength { field: String, expected: usize, found: usize },
    InvalidValue { field: String, value: String },
    XmlProcessingError(String),
    /// A name references an entity that does not exist (link, joint, group, solver).
    UnknownName { kind: &'static str, name: String },
    DuplicateName { kind: &'static str, name: String },
    /// The link tree is not a tree: no root, several roots or a cycle.
    MalformedTree(String),
    KinematicsConfigurationError(String),
}

impl std::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            ParameterError::IoError(ref err) =>
                write!(f, "IO Error: {}", err),
            ParameterError::ParseError(ref msg) =>
                write!(f, "Parse Error: {}", msg),
            ParameterError::WrongAngle(ref msg) =>
                write!(f, "Wrong angle representation: {}", msg),
            ParameterError::MissingField(ref field) =>
                write!(f, "Missing Field: {}", field),
            ParameterError::InvalidLength { ref field, expected, found } =>
                write!(f, "Invalid Length of {}: expected {}, found {}", field, expected, found),
            ParameterError::InvalidValue { ref field, ref value } =>
                write!(f, "Invalid value of {}: {}", field, value),
            ParameterError::XmlProcessingError(ref err) =>
                write!(f, "XML Processing Error: {}", err),
            ParameterError::UnknownName { kind, ref name } =>
                write!(f, "Unknown {}: '{}'", kind, name),
            ParameterError::DuplicateName { kind, ref name } =>
                write!(f, "Duplicate {}: '{}'", kind, name),
            ParameterError::MalformedTree(ref msg) =>
                write!(f, "Malformed link tree: {}", msg),
            ParameterError::KinematicsConfigurationError(ref err) =>
                write!(f, "Kinematics Configuration Error: {}", err),
        }
    }
}

impl std::error::Error for ParameterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParameterError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ParameterError {
    fn from(err: io::Error) -> Self {
        ParameterError::IoError(err)
    }
}
