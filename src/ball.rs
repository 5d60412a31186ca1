//! # Functions and Helmholtz problems in the unit ball
//!
//! Functions in the ball are represented on the doubled domain
//! `(r, lambda, theta)` in `[-1, 1] x [-pi, pi) x [-pi, pi)`, where
//! the point is `(r sin(theta) cos(lambda), r sin(theta) sin(lambda), r cos(theta))`.
//! The radial direction is expanded in Chebyshev polynomials, azimuth
//! and polar angle in Fourier modes. Coefficient tensors have the
//! shape `(m, n, p)`: radial, azimuthal, polar.
//!
//! [`BallHelmholtz`] solves `lap(u) - K^2 u = f` with Dirichlet or
//! Neumann data on the unit sphere.
//!
//! ```
//! use chebpde::{poisson, BoundaryData, Rhs};
//! let f = Rhs::from_fn(|_, _, _| 6.);
//! let g = BoundaryData::from_fn(|_, _, _| 1.);
//! let u = poisson(&f, &g, 8, 8, 8).unwrap();
//! assert!((u.eval(0.1, 0.2, 0.3) - 0.14).abs() < 1e-8);
//! ```
pub mod helmholtz;
pub mod operators;
pub use helmholtz::{helmholtz, helmholtz_neumann, poisson, BallHelmholtz, BoundaryKind};
pub use operators::OperatorMatrices;

use crate::bases::chebyshev::{nodes_2nd_kind, polynomials};
use crate::bases::fourier::{alias_coeffs, wavenumbers};
use crate::bases::padding::resize_chebyshev;
use crate::bases::{Chebyshev, Fourier};
use crate::solver::utils::to_complex;
use crate::{Complex, Real};
use ndarray::prelude::*;
use ndarray::Data;

/// Coefficients of a function in the unit ball
#[derive(Debug, Clone)]
pub struct BallFunction {
    /// Coefficient tensor (radial, azimuthal, polar)
    pub vhat: Array3<Complex>,
}

impl BallFunction {
    /// Function from its coefficient tensor
    pub fn from_coeffs(vhat: Array3<Complex>) -> Self {
        BallFunction { vhat }
    }

    /// Sample `f(x, y, z)` on a `(m, n, p)` grid
    pub fn from_fn<F: Fn(Real, Real, Real) -> Real>(f: F, m: usize, n: usize, p: usize) -> Self {
        let r = nodes_2nd_kind(m);
        let (mut lam, mut th) = (Fourier::new(n), Fourier::new(p));
        let values = Array3::from_shape_fn((m, n, p), |(i, j, l)| {
            let (x, y, z) = to_cartesian(r[i], lam.x[j], th.x[l]);
            f(x, y, z)
        });
        let vhat = Chebyshev::new(m).forward_axis(&values, 0);
        let vhat = lam.forward_axis(&to_complex(&vhat), 1);
        BallFunction {
            vhat: th.forward_axis(&vhat, 2),
        }
    }

    /// Discretization size (m, n, p)
    pub fn size(&self) -> (usize, usize, usize) {
        self.vhat.dim()
    }

    /// Coefficient tensor
    pub fn coeffs(&self) -> &Array3<Complex> {
        &self.vhat
    }

    /// Change the discretization size; the Chebyshev direction is
    /// truncated or padded, the Fourier directions are aliased.
    pub fn resize(&self, m: usize, n: usize, p: usize) -> Self {
        let mut vhat = resize_chebyshev(&self.vhat, 0, m);
        vhat = alias_axis(&vhat, 1, n);
        BallFunction {
            vhat: alias_axis(&vhat, 2, p),
        }
    }

    /// Evaluate at `(r, lambda, theta)` of the doubled domain
    pub fn eval_spherical(&self, r: Real, lambda: Real, theta: Real) -> Real {
        let (m, n, p) = self.size();
        let t = polynomials(m, r).mapv(|v| Complex::new(v, 0.));
        let el: Array1<Complex> = wavenumbers(n)
            .into_iter()
            .map(|k| Complex::new(0., k as Real * lambda).exp())
            .collect();
        let eth: Array1<Complex> = wavenumbers(p)
            .into_iter()
            .map(|k| Complex::new(0., k as Real * theta).exp())
            .collect();
        let mut sum = Complex::new(0., 0.);
        for (i, ti) in t.iter().enumerate() {
            let slice = self.vhat.index_axis(Axis(0), i);
            sum += ti * el.dot(&slice.dot(&eth));
        }
        sum.re
    }

    /// Evaluate at a cartesian point inside the ball
    pub fn eval(&self, x: Real, y: Real, z: Real) -> Real {
        let (r, lambda, theta) = to_spherical(x, y, z);
        self.eval_spherical(r, lambda, theta)
    }

    /// Largest coefficient magnitude per azimuthal mode
    pub fn mode_norms(&self) -> Array1<Real> {
        self.vhat
            .axis_iter(Axis(1))
            .map(|slice| slice.iter().fold(0., |acc: Real, v| acc.max(v.norm())))
            .collect()
    }
}

/// Right hand side of a ball problem
pub enum Rhs {
    /// Volumetric function f(x, y, z)
    Function(Box<dyn Fn(Real, Real, Real) -> Real>),
    /// Precomputed coefficients
    Coeffs(BallFunction),
}

impl Rhs {
    /// Right hand side from a function
    pub fn from_fn<F: Fn(Real, Real, Real) -> Real + 'static>(f: F) -> Self {
        Rhs::Function(Box::new(f))
    }

    /// Coefficients on a `(m, n, p)` discretization
    pub fn coeffs(&self, m: usize, n: usize, p: usize) -> Array3<Complex> {
        match self {
            Rhs::Function(f) => BallFunction::from_fn(f, m, n, p).vhat,
            Rhs::Coeffs(b) => b.resize(m, n, p).vhat,
        }
    }
}

impl From<BallFunction> for Rhs {
    fn from(b: BallFunction) -> Self {
        Rhs::Coeffs(b)
    }
}

/// Data on the unit sphere
pub enum BoundaryData {
    /// Function g(x, y, z), evaluated on the sphere
    Function(Box<dyn Fn(Real, Real, Real) -> Real>),
    /// Fourier coefficients (azimuthal, polar) of the doubled sphere
    Coeffs(Array2<Complex>),
}

impl BoundaryData {
    /// Boundary data from a function
    pub fn from_fn<F: Fn(Real, Real, Real) -> Real + 'static>(f: F) -> Self {
        BoundaryData::Function(Box::new(f))
    }

    /// Coefficients on a `(n, p)` discretization of the sphere
    pub fn coeffs(&self, n: usize, p: usize) -> Array2<Complex> {
        match self {
            BoundaryData::Function(g) => {
                let (mut lam, mut th) = (Fourier::new(n), Fourier::new(p));
                let values = Array2::from_shape_fn((n, p), |(j, l)| {
                    let (x, y, z) = to_cartesian(1., lam.x[j], th.x[l]);
                    Complex::new(g(x, y, z), 0.)
                });
                th.forward_axis(&lam.forward_axis(&values, 0), 1)
            }
            BoundaryData::Coeffs(c) => alias_axis(&alias_axis(c, 0, n), 1, p),
        }
    }
}

/// Coefficients of the data at the antipodal points, `g(-x)`:
/// entry `(k, l)` becomes `(-1)^(k+l) g_(k,-l)`.
///
/// For even `p` the unpaired wavenumber `-p/2` maps to zero.
pub fn reflect<S: Data<Elem = Complex>>(g: &ArrayBase<S, Ix2>) -> Array2<Complex> {
    let (n, p) = g.dim();
    let (kn, kp) = (wavenumbers(n), wavenumbers(p));
    let h = (p / 2) as i64;
    Array2::from_shape_fn((n, p), |(j, l)| {
        let target = h - kp[l];
        if target < 0 || target >= p as i64 {
            return Complex::new(0., 0.);
        }
        let sign = if (kn[j] + kp[l]).rem_euclid(2) == 0 { 1. } else { -1. };
        g[[j, target as usize]] * sign
    })
}

fn alias_axis<S, D>(a: &ArrayBase<S, D>, axis: usize, new_len: usize) -> Array<Complex, D>
where
    S: Data<Elem = Complex>,
    D: ndarray::Dimension,
{
    let mut shape = a.raw_dim();
    shape[axis] = new_len;
    let mut out = Array::<Complex, D>::zeros(shape);
    for (lane_in, mut lane_out) in a.lanes(Axis(axis)).into_iter().zip(out.lanes_mut(Axis(axis))) {
        lane_out.assign(&alias_coeffs(&lane_in, new_len));
    }
    out
}

/// Doubled spherical coordinates to cartesian
pub fn to_cartesian(r: Real, lambda: Real, theta: Real) -> (Real, Real, Real) {
    (
        r * theta.sin() * lambda.cos(),
        r * theta.sin() * lambda.sin(),
        r * theta.cos(),
    )
}

/// Cartesian to spherical coordinates with `r >= 0`, `theta` in `[0, pi]`
pub fn to_spherical(x: Real, y: Real, z: Real) -> (Real, Real, Real) {
    let r = (x * x + y * y + z * z).sqrt();
    if r == 0. {
        return (0., 0., 0.);
    }
    let theta = (z / r).max(-1.).min(1.).acos();
    (r, y.atan2(x), theta)
}
