//! Error module for the neurosim library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq, Clone)]
pub enum NeuroError {
    /// Error for an invalid configuration, e.g., a dimension mismatch or a
    /// duplicate/missing termination name.
    Structural(String),
    /// Error raised while executing, e.g., an unresolvable probe target or a
    /// failure propagated from a constituent's own run.
    Simulation(String),
    /// Error for an ill-formed argument, e.g., mismatched time/current sample lengths.
    InvalidArgument(String),
    /// Error while rebuilding derived state during a clone. Cloning is
    /// all-or-nothing, never partially applied.
    CloneError(String),
}

impl fmt::Display for NeuroError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NeuroError::Structural(e) => write!(f, "Structural error: {}", e),
            NeuroError::Simulation(e) => write!(f, "Simulation error: {}", e),
            NeuroError::InvalidArgument(e) => write!(f, "Invalid argument: {}", e),
            NeuroError::CloneError(e) => write!(f, "Clone error: {}", e),
        }
    }
}

impl Error for NeuroError {}
