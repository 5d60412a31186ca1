//! Discretized operators of the ball Helmholtz problem
//!
//! The equation `lap(u) - K^2 u = f` is multiplied by `r^2 sin^2(theta)`:
//! .. math::
//!
//!  sin^2 (r^2 u_rr + 2 r u_r) + sin^2 u_tt + sin cos u_t + u_ll - K^2 r^2 sin^2 u
//!     = r^2 sin^2 f
//!
//! Radial operators map Chebyshev coefficients to C^(2), which
//! makes them banded. Polar operators act on centered Fourier
//! coefficients, the azimuthal derivative is diagonal.
use super::helmholtz::BoundaryKind;
use crate::bases::ultraspherical::{convert_chain, convert_mat, diff_mat, mult_x};
use crate::bases::Fourier;
use crate::solver::utils::{diag, to_complex};
use crate::{Complex, Real};
use ndarray::prelude::*;

/// Radial and polar operator matrices for one discretization size
#[derive(Debug, Clone)]
pub struct OperatorMatrices {
    /// Radial size
    pub m: usize,
    /// Polar size
    pub p: usize,
    /// `r^2 D^2 + 2 r D`, from T to C^(2)
    pub radial_diff: Array2<Complex>,
    /// `r^2`, from T to C^(2)
    pub radial_mass: Array2<Complex>,
    /// Conversion from T to C^(2)
    pub conversion: Array2<Complex>,
    /// Multiplication by `sin^2(theta)`
    pub sin2: Array2<Complex>,
    /// Multiplication by `cos(theta) sin(theta)`
    pub cossin: Array2<Complex>,
    /// First polar derivative
    pub polar_d1: Array2<Complex>,
    /// Second polar derivative
    pub polar_d2: Array2<Complex>,
}

impl OperatorMatrices {
    /// Build all matrices for `m` radial and `p` polar coefficients
    pub fn new(m: usize, p: usize) -> Self {
        let mr = mult_x(m, 2);
        let mr2 = mr.dot(&mr);
        let s1 = convert_mat(m, 1);
        let radial_diff = mr2.dot(&diff_mat(m, 2)) + mr.dot(&s1).dot(&diff_mat(m, 1)) * 2.;
        let conversion = convert_chain(m, 2);
        let radial_mass = mr2.dot(&conversion);
        let polar = Fourier::new(p);
        OperatorMatrices {
            m,
            p,
            radial_diff: to_complex(&radial_diff),
            radial_mass: to_complex(&radial_mass),
            conversion: to_complex(&conversion),
            sin2: polar.mult_sin2(),
            cossin: polar.mult_cossin(),
            polar_d1: polar.diff_matrix(1),
            polar_d2: polar.diff_matrix(2),
        }
    }

    /// `sin^2 D^2 + sin cos D + az I`, where `az` is the azimuthal
    /// second derivative of the mode (`-k^2`)
    pub fn polar(&self, az: Real) -> Array2<Complex> {
        self.sin2.dot(&self.polar_d2)
            + self.cossin.dot(&self.polar_d1)
            + Array2::<Complex>::eye(self.p) * Complex::new(az, 0.)
    }

    /// Boundary rows acting on Chebyshev coefficients at r = 1 and r = -1
    pub fn boundary_rows(&self, kind: BoundaryKind) -> [Array1<Real>; 2] {
        let m = self.m;
        match kind {
            BoundaryKind::Dirichlet => [
                Array1::ones(m),
                Array1::from_shape_fn(m, |j| if j % 2 == 0 { 1. } else { -1. }),
            ],
            BoundaryKind::Neumann => [
                Array1::from_shape_fn(m, |j| (j * j) as Real),
                Array1::from_shape_fn(m, |j| {
                    let sign = if j % 2 == 0 { -1. } else { 1. };
                    sign * (j * j) as Real
                }),
            ],
        }
    }
}

/// Diagonal of the azimuthal second derivative, `-k^2` per mode
pub fn azimuthal_d2(n: usize) -> Array1<Real> {
    diag(&Fourier::new(n).diff_matrix(2), 0).mapv(|v| v.re)
}
