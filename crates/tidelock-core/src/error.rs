//! Simulation error types

use thiserror::Error;

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;

/// Errors that can occur while configuring or advancing the simulation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// A setter or configuration value is outside its physical range
    #[error("invalid {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// The integrator produced a non-finite angle or velocity
    #[error("pendulum state diverged at t = {sim_time:.3} s; reset required")]
    Diverged { sim_time: f64 },

    /// FFT size is not a power of two
    #[error("FFT size must be a power of two >= 2, got {0}")]
    InvalidFftSize(usize),

    /// Configuration file could not be read, parsed or validated
    #[error("configuration error: {0}")]
    Config(String),
}

impl SimError {
    /// Check if the simulation can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimError::InvalidParameter { .. })
    }

    /// Check if this error reports a diverged integrator
    pub fn is_divergence(&self) -> bool {
        matches!(self, SimError::Diverged { .. })
    }
}

/// Reject values that are NaN or infinite.
pub(crate) fn ensure_finite(name: &'static str, value: f64) -> SimResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        })
    }
}

/// Reject values that are not strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> SimResult<f64> {
    ensure_finite(name, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(SimError::InvalidParameter {
            name,
            value,
            reason: "must be > 0",
        })
    }
}

/// Reject values below `min`.
pub(crate) fn ensure_at_least(name: &'static str, value: f64, min: f64, reason: &'static str) -> SimResult<f64> {
    ensure_finite(name, value)?;
    if value >= min {
        Ok(value)
    } else {
        Err(SimError::InvalidParameter { name, value, reason })
    }
}
