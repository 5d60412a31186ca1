//! # Time integration of differential-algebraic systems
//!
//! Systems of the form `M y' = f(t, y)` with a constant, possibly
//! singular mass matrix `M`. Rows of `M` which vanish are algebraic
//! constraints, they are satisfied at every accepted step.
//!
//! The integrator reports every requested output time to
//! [`DaeSystem::output`]; the callback may stop the integration by
//! returning [`Control::Stop`].
pub mod bdf;
pub use bdf::{Bdf, BdfOptions};

use crate::error::Result;
use crate::Real;
use ndarray::{Array1, Array2};

/// Maximum number of steps of a single integration run
pub const MAX_TIMESTEP: usize = 100_000;

/// Return value of output callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Proceed to the next output time
    Continue,
    /// Terminate the integration
    Stop,
}

/// How an integration run ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    /// All output times were reached
    Completed,
    /// The output callback requested a stop at time `t`
    Stopped {
        /// Time of the rejected output
        t: Real,
    },
}

/// Differential-algebraic system `M y' = f(t, y)`
pub trait DaeSystem {
    /// Right hand side f(t, y)
    fn rhs(&mut self, t: Real, y: &Array1<Real>) -> Result<Array1<Real>>;
    /// Mass matrix
    fn mass(&self) -> &Array2<Real>;
    /// Called at each requested output time after the first
    fn output(&mut self, t: Real, y: &Array1<Real>) -> Result<Control>;
}

/// Integrate a [`DaeSystem`] through a list of output times
pub trait Integrator {
    /// Integrate from `tspan[0]`, starting with `y0`
    fn integrate<S: DaeSystem>(&self, system: &mut S, tspan: &[Real], y0: &Array1<Real>)
        -> Result<Status>;
}
