//! Options of [`pde15s`](super::pde15s)
use super::assemble::MassFn;
use crate::field::{SpectralFunction, MAX_LENGTH};
use crate::integrate::{BdfOptions, MAX_TIMESTEP};
use crate::Real;
use ndarray::Array2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Callback receiving every stored snapshot
pub type Observer = Box<dyn FnMut(Real, &[SpectralFunction])>;

/// Parameters of [`pde15s`](super::pde15s)
///
/// ```
/// use chebpde::PdeOptions;
/// let opts = PdeOptions::default().with_eps(1e-8).with_n(33);
/// assert_eq!(opts.n, Some(33));
/// ```
pub struct PdeOptions {
    /// Resolution tolerance of the spatial grid
    pub eps: Real,
    /// Fixed grid length, disables adaptivity
    pub n: Option<usize>,
    /// Largest adaptive grid length
    pub max_length: usize,
    /// Absolute tolerance of the integrator, at most `eps / 10`
    pub abs_tol: Real,
    /// Relative tolerance of the integrator, at most `eps / 10`
    pub rel_tol: Real,
    /// First time step
    pub initial_step: Option<Real>,
    /// Largest time step
    pub max_step: Option<Real>,
    /// Highest derivative per variable, inferred if not set
    pub diff_order: Option<Vec<usize>>,
    /// Time derivative present per variable, all if not set
    pub pde_flag: Option<Vec<bool>>,
    /// Custom mass multiplier
    pub mass: Option<MassFn>,
    /// Report snapshots in the log
    pub plot: bool,
    /// Keep earlier snapshots in the report
    pub hold_plot: bool,
    /// Style of the report
    pub plot_style: Option<String>,
    /// Snapshot callback
    pub observer: Option<Observer>,
    /// Interactive stop, checked at output times
    pub stop: Option<Arc<AtomicBool>>,
}

impl Default for PdeOptions {
    fn default() -> Self {
        PdeOptions {
            eps: 1e-6,
            n: None,
            max_length: MAX_LENGTH,
            abs_tol: 1e-6,
            rel_tol: 1e-3,
            initial_step: None,
            max_step: None,
            diff_order: None,
            pde_flag: None,
            mass: None,
            plot: false,
            hold_plot: false,
            plot_style: None,
            observer: None,
            stop: None,
        }
    }
}

impl PdeOptions {
    /// Set the resolution tolerance
    pub fn with_eps(mut self, eps: Real) -> Self {
        self.eps = eps;
        self
    }

    /// Use a fixed grid of `n` points
    pub fn with_n(mut self, n: usize) -> Self {
        self.n = Some(n);
        self
    }

    /// Limit adaptive grid growth
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set the integrator tolerances
    pub fn with_tolerances(mut self, abs_tol: Real, rel_tol: Real) -> Self {
        self.abs_tol = abs_tol;
        self.rel_tol = rel_tol;
        self
    }

    /// Set the largest time step
    pub fn with_max_step(mut self, max_step: Real) -> Self {
        self.max_step = Some(max_step);
        self
    }

    /// Set the differential order per variable
    pub fn with_diff_order(mut self, diff_order: Vec<usize>) -> Self {
        self.diff_order = Some(diff_order);
        self
    }

    /// Mark variables with (`true`) or without time derivative
    pub fn with_pde_flag(mut self, pde_flag: Vec<bool>) -> Self {
        self.pde_flag = Some(pde_flag);
        self
    }

    /// Set a mass multiplier, called with the grid length
    pub fn with_mass<F: Fn(usize) -> Array2<Real> + 'static>(mut self, mass: F) -> Self {
        self.mass = Some(Box::new(mass));
        self
    }

    /// Report snapshots in the log
    pub fn with_plot(mut self, hold: bool, style: Option<&str>) -> Self {
        self.plot = true;
        self.hold_plot = hold;
        self.plot_style = style.map(str::to_string);
        self
    }

    /// Receive every stored snapshot
    pub fn with_observer<F: FnMut(Real, &[SpectralFunction]) + 'static>(mut self, f: F) -> Self {
        self.observer = Some(Box::new(f));
        self
    }

    /// Stop once the flag is raised
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Integrator parameters, tolerances clamped to `eps / 10`
    pub fn bdf_options(&self) -> BdfOptions {
        let cap = self.eps / 10.;
        BdfOptions {
            abs_tol: self.abs_tol.min(cap),
            rel_tol: self.rel_tol.min(cap),
            initial_step: self.initial_step,
            max_step: self.max_step,
            max_steps: MAX_TIMESTEP,
            ..BdfOptions::default()
        }
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .map_or(false, |s| s.load(Ordering::Relaxed))
    }
}
