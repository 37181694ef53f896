use crate::kernel::KernelOpError;
use std::fmt;
use thiserror::Error;

/// Result type for reference-geometry and entity queries.
pub type ModelResult<T> = Result<T, ModelError>;

/// Which end of an extracted curve failed to project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    First,
    Second,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::First => write!(f, "first"),
            Endpoint::Second => write!(f, "second"),
        }
    }
}

/// Errors raised by reference geometry and entity queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unsupported geometry type: expected {expected}, found {found}")]
    UnsupportedGeometryType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("No projection of point {point:?} onto the reference")]
    ProjectionFailure { point: [f64; 3] },

    #[error("Could not project the {endpoint} endpoint onto the extracted curve")]
    EndpointProjectionFailure { endpoint: Endpoint },

    #[error("No intersection curve between basis and reference shape")]
    NoIntersectionCurve,

    #[error("Points do not define a plane")]
    DegeneratePlane,

    #[error("Entity '{label}' has no reference {which}")]
    MissingReference { label: String, which: &'static str },

    #[error("Entity has no shape")]
    NullShape,

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelOpError),
}
