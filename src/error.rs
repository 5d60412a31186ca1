//! # Errors
//!
//! Every fallible operation of this crate returns [`PdeError`].
//! Integrator failures carry their own [`IntegrateError`], which is
//! passed through unchanged except for a dimension mismatch, that is
//! reported as a configuration problem of the boundary conditions.
use ndarray_linalg::error::LinalgError;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, PdeError>;

/// Collection of errors raised by the solvers
#[derive(Debug, Error)]
pub enum PdeError {
    /// Malformed boundary conditions, dimension mismatches or
    /// input forms that are no longer supported.
    #[error("configuration error: {0}")]
    Config(String),
    /// Input that is understood, but not supported (piecewise initial data)
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),
    /// User handle with a signature that can not be normalized
    #[error("parse error: {0}")]
    Parse(String),
    /// Adaptive refinement exceeded its limit
    #[error("no convergence: {0}")]
    Convergence(String),
    /// Failure inside the time integrator
    #[error(transparent)]
    Integrate(#[from] IntegrateError),
    /// Failure of a dense linear algebra routine
    #[error("linear algebra failure: {0}")]
    Linalg(#[from] LinalgError),
}

/// Errors of the stiff DAE integrator
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntegrateError {
    /// Mass matrix, initial vector and residual do not agree in size
    #[error("dimension mismatch: mass matrix is {rows}x{cols}, state has length {state}")]
    DimensionMismatch {
        /// Rows of the mass matrix
        rows: usize,
        /// Columns of the mass matrix
        cols: usize,
        /// Length of the state vector
        state: usize,
    },
    /// Step size fell below the resolvable limit
    #[error("step size {h:e} too small at t = {t}")]
    StepSizeTooSmall {
        /// Time of failure
        t: f64,
        /// Rejected step size
        h: f64,
    },
    /// Maximum number of steps exceeded
    #[error("maximum number of {0} steps exceeded")]
    TooManySteps(usize),
    /// Residual or Jacobian evaluated to NaN or infinity
    #[error("non-finite values encountered at t = {0}")]
    NonFinite(f64),
    /// Singular iteration matrix
    #[error("singular iteration matrix at t = {0}")]
    Singular(f64),
}
