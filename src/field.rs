//! # One dimensional spectral functions
//!
//! [`SpectralFunction`] holds the values of a smooth function at
//! Chebyshev points of the second kind on an interval, together with
//! its Chebyshev coefficients. It is immutable once constructed, all
//! operations return new functions.
//!
//! A function is *happy* if the tail of its coefficients has decayed
//! below a relative tolerance, i.e. the grid resolves the function.
//!
//! [`Piecewise`] collects functions on adjacent intervals,
//! [`Quasimatrix`] a set of functions on the same interval
//! (columns of a snapshot set).
pub mod piecewise;
pub mod quasimatrix;
pub use piecewise::Piecewise;
pub use quasimatrix::Quasimatrix;

use crate::bases::chebyshev::{
    clenshaw, cumsum_coeffs, diff_coeffs, integrate_coeffs, nodes_2nd_kind,
};
use crate::bases::Chebyshev;
use crate::error::{PdeError, Result};
use crate::Real;
use ndarray::prelude::*;

/// Smallest grid used by adaptive constructors
pub const MIN_LENGTH: usize = 9;

/// Default upper limit for adaptive constructors
pub const MAX_LENGTH: usize = 1025;

/// Smooth function on an interval, stored by values and coefficients
#[derive(Debug, Clone)]
pub struct SpectralFunction {
    domain: [Real; 2],
    /// Values at second kind points mapped to the domain
    pub v: Array1<Real>,
    /// Chebyshev coefficients
    pub vhat: Array1<Real>,
}

impl SpectralFunction {
    /// Function from values at the second kind points of `domain`
    ///
    /// # Panics
    /// Empty `values` or an empty interval.
    pub fn from_values(values: Array1<Real>, domain: [Real; 2]) -> Self {
        assert!(!values.is_empty(), "SpectralFunction needs at least one value");
        assert!(domain[0] < domain[1], "Invalid domain {:?}", domain);
        let vhat = Chebyshev::new(values.len()).forward(&values);
        SpectralFunction {
            domain,
            v: values,
            vhat,
        }
    }

    /// Function from Chebyshev coefficients
    pub fn from_coeffs(coeffs: Array1<Real>, domain: [Real; 2]) -> Self {
        assert!(!coeffs.is_empty(), "SpectralFunction needs at least one coefficient");
        assert!(domain[0] < domain[1], "Invalid domain {:?}", domain);
        let v = Chebyshev::new(coeffs.len()).backward(&coeffs);
        SpectralFunction {
            domain,
            v,
            vhat: coeffs,
        }
    }

    /// Sample `f` at `n` points
    ///
    /// # Example
    /// ```
    /// use chebpde::SpectralFunction;
    /// let f = SpectralFunction::from_fn(|x| x * x, [0., 2.], 5);
    /// assert!((f.eval(1.5) - 2.25).abs() < 1e-12);
    /// ```
    pub fn from_fn<F: Fn(Real) -> Real>(f: F, domain: [Real; 2], n: usize) -> Self {
        let values = points(domain, n).mapv(f);
        Self::from_values(values, domain)
    }

    /// Sample `f` on grids of length 9, 17, 33, ... until the result
    /// is happy, then chop the coefficient tail.
    ///
    /// # Errors
    /// [`PdeError::Convergence`] if no grid up to `max_len` resolves `f`.
    pub fn adaptive<F: Fn(Real) -> Real>(
        f: F,
        domain: [Real; 2],
        tol: Real,
        max_len: usize,
    ) -> Result<Self> {
        let mut n = MIN_LENGTH;
        while n <= max_len {
            let candidate = Self::from_fn(&f, domain, n);
            if candidate.is_happy(tol) {
                return Ok(candidate.simplify(tol));
            }
            n = 2 * n - 1;
        }
        Err(PdeError::Convergence(format!(
            "function not resolved on {} points",
            max_len
        )))
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.v.len()
    }

    /// True if no points are stored, never the case after construction
    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    /// Interval
    pub fn domain(&self) -> [Real; 2] {
        self.domain
    }

    /// Grid points on the domain
    pub fn points(&self) -> Array1<Real> {
        points(self.domain, self.len())
    }

    /// Values at the grid points
    pub fn values(&self) -> &Array1<Real> {
        &self.v
    }

    /// Chebyshev coefficients
    pub fn coeffs(&self) -> &Array1<Real> {
        &self.vhat
    }

    /// Largest absolute value on the grid
    pub fn vscale(&self) -> Real {
        self.v.iter().fold(0., |acc, v| acc.max(v.abs()))
    }

    fn to_reference(&self, x: Real) -> Real {
        let [a, b] = self.domain;
        (2. * x - a - b) / (b - a)
    }

    /// Evaluate at x
    pub fn eval(&self, x: Real) -> Real {
        clenshaw(&self.vhat, self.to_reference(x))
    }

    /// Derivative of order `k`, on a grid of the same length
    pub fn diff(&self, k: usize) -> Self {
        let [a, b] = self.domain;
        let mut c = self.vhat.clone();
        for _ in 0..k {
            c = diff_coeffs(&c) * (2. / (b - a));
        }
        Self::from_coeffs(c, self.domain)
    }

    /// Definite integral over the domain (Clenshaw-Curtis)
    pub fn sum(&self) -> Real {
        let [a, b] = self.domain;
        integrate_coeffs(&self.vhat) * (b - a) / 2.
    }

    /// Indefinite integral vanishing at the left end
    pub fn cumsum(&self) -> Self {
        let [a, b] = self.domain;
        Self::from_coeffs(cumsum_coeffs(&self.vhat) * ((b - a) / 2.), self.domain)
    }

    /// Interpolant evaluated on a grid of length `n`
    ///
    /// Growing is exact, shrinking aliases the coefficients.
    pub fn resample(&self, n: usize) -> Self {
        if n == self.len() {
            return self.clone();
        }
        if n > self.len() {
            let mut c = Array1::zeros(n);
            c.slice_mut(s![..self.len()]).assign(&self.vhat);
            return Self::from_coeffs(c, self.domain);
        }
        let values = nodes_2nd_kind(n).mapv(|s| clenshaw(&self.vhat, s));
        Self::from_values(values, self.domain)
    }

    /// Keep the first `n` coefficients
    pub fn truncate(&self, n: usize) -> Self {
        let n = n.max(1).min(self.len());
        Self::from_coeffs(self.vhat.slice(s![..n]).to_owned(), self.domain)
    }

    /// Check whether the coefficient tail has decayed below `tol`
    /// relative to the function's scale.
    ///
    /// The tail consists of the last `max(5, round((n-1)/8))` coefficients.
    pub fn is_happy(&self, tol: Real) -> bool {
        let n = self.len();
        let vscale = self.vscale().max(self.vhat.iter().fold(0., |acc, v| acc.max(v.abs())));
        if vscale == 0. {
            return true;
        }
        let tail = tail_length(n).min(n);
        self.vhat
            .slice(s![n - tail..])
            .iter()
            .all(|c| c.abs() <= tol * vscale)
    }

    /// Chop trailing coefficients below `tol` relative to the scale
    pub fn simplify(&self, tol: Real) -> Self {
        let vscale = self.vscale();
        if vscale == 0. {
            return Self::from_coeffs(Array1::zeros(1), self.domain);
        }
        let cutoff = self
            .vhat
            .iter()
            .rposition(|c| c.abs() > tol * vscale)
            .map_or(1, |i| i + 1);
        self.truncate(cutoff)
    }
}

/// Number of tail coefficients inspected by the happiness test
pub(crate) fn tail_length(n: usize) -> usize {
    let eighth = ((n as Real - 1.) / 8.).round() as usize;
    eighth.max(5)
}

/// Second kind points mapped to `domain`
pub fn points(domain: [Real; 2], n: usize) -> Array1<Real> {
    let [a, b] = domain;
    nodes_2nd_kind(n).mapv(|s| 0.5 * (a + b) + 0.5 * (b - a) * s)
}

/// Smallest grid length `2^k + 1 >= max(9, len)`
pub fn adaptive_length(len: usize) -> usize {
    let mut n = MIN_LENGTH;
    while n < len {
        n = 2 * n - 1;
    }
    n
}
