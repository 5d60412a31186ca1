//! Helmholtz solver in the unit ball
//!
//! Solves
//! .. math::
//!
//!  lap(u) - K^2 u = f
//!
//! with u = g (Dirichlet) or du/dr = h (Neumann) on the unit sphere.
//!
//! After the multiplication with `r^2 sin^2(theta)` the azimuthal
//! Fourier modes decouple. Mode k gives the Sylvester equation
//! .. math::
//!
//!  A X B^T + C X D^T = F
//!
//! for the (radial x polar) coefficients X, with
//! A = radial_diff - K^2 radial_mass, B = sin^2, C = conversion and
//! D = polar(k). For |K| > 1 the radial terms are divided by K^2.
//!
//! On the doubled domain the sphere is hit twice, at r = 1 and at
//! r = -1 (antipodal data). Their sum and difference constrain
//! coefficients of one radial parity each. Eliminating the highest
//! coefficient of each parity and dropping the last two equations
//! yields a square Sylvester equation of size (m-2) x p.
//!
//! The pure Neumann problem with K = 0 is singular for k = 0, the
//! constant is removed from the unknowns and the system is solved in
//! the least squares sense.
use super::operators::{azimuthal_d2, OperatorMatrices};
use super::{reflect, BallFunction, BoundaryData, Rhs};
use crate::bases::padding::{pad_len, resize_chebyshev, resize_fourier, Parity};
use crate::error::{PdeError, Result};
use crate::solver::utils::max_abs;
use crate::solver::Sylvester;
use crate::{Complex, Real};
use log::{debug, warn};
use ndarray::parallel::prelude::*;
use ndarray::prelude::*;

/// Modes whose data are below this are returned as exact zeros
const ZERO_MODE_TOL: Real = 1e-16;
/// Largest accepted defect of incompatible Neumann data
const COMPATIBILITY_TOL: Real = 1e-8;

/// Type of the boundary condition on the sphere
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Prescribed values
    Dirichlet,
    /// Prescribed radial derivative
    Neumann,
}

/// Solver for `lap(u) - K^2 u = f` in the unit ball
#[derive(Debug, Clone)]
pub struct BallHelmholtz {
    /// Radial size
    pub m: usize,
    /// Azimuthal size
    pub n: usize,
    /// Polar size
    pub p: usize,
    /// Helmholtz frequency
    pub k: Real,
    /// Boundary condition
    pub kind: BoundaryKind,
    ops: OperatorMatrices,
    azimuthal: Array1<Real>,
}

/// Sylvester equation of one mode after boundary elimination
struct ReducedMode {
    sylv: Sylvester,
    rhs: Array2<Complex>,
    /// Eliminated radial index, normalized row and data per parity
    eliminated: [(usize, Array1<Complex>, Array1<Complex>); 2],
    keep: Vec<usize>,
}

impl BallHelmholtz {
    /// Return solver for `(m, n, p)` coefficients
    ///
    /// # Errors
    /// [`PdeError::Config`] for `m < 4`, `n < 1`, `p < 1` or a
    /// non-finite frequency.
    pub fn new(m: usize, n: usize, p: usize, k: Real, kind: BoundaryKind) -> Result<Self> {
        if m < 4 || n < 1 || p < 1 {
            return Err(PdeError::Config(format!(
                "ball discretization needs m >= 4, n >= 1, p >= 1, got ({}, {}, {})",
                m, n, p
            )));
        }
        if !k.is_finite() {
            return Err(PdeError::Config(format!("invalid helmholtz frequency {}", k)));
        }
        Ok(BallHelmholtz {
            m,
            n,
            p,
            k,
            kind,
            ops: OperatorMatrices::new(m, p),
            azimuthal: azimuthal_d2(n),
        })
    }

    /// Solve for right hand side `f` and boundary data `bc`
    ///
    /// # Errors
    /// [`PdeError::Linalg`] if the Sylvester equation of a mode, or the
    /// least squares system of the singular Neumann mode, can not be
    /// solved.
    ///
    /// # Example
    /// Poisson problem with solution `r^2`
    /// ```
    /// use chebpde::{BallHelmholtz, BoundaryData, BoundaryKind, Rhs};
    /// let solver = BallHelmholtz::new(9, 9, 9, 0., BoundaryKind::Dirichlet).unwrap();
    /// let f = Rhs::from_fn(|_, _, _| 6.);
    /// let g = BoundaryData::from_fn(|_, _, _| 1.);
    /// let u = solver.solve(&f, &g).unwrap();
    /// assert!((u.eval(0.5, 0., 0.) - 0.25).abs() < 1e-10);
    /// ```
    pub fn solve(&self, f: &Rhs, bc: &BoundaryData) -> Result<BallFunction> {
        let (m, n, p) = (self.m, self.n, self.p);
        let fhat = f.coeffs(m, n, p);
        let g_plus = bc.coeffs(n, p);
        let g_minus = match self.kind {
            BoundaryKind::Dirichlet => reflect(&g_plus),
            BoundaryKind::Neumann => -reflect(&g_plus),
        };
        // (radial, polar, azimuthal)
        let fhat = fhat.permuted_axes([0, 2, 1]);
        let modes = (0..n)
            .into_par_iter()
            .map(|j| {
                self.solve_mode(
                    j,
                    fhat.index_axis(Axis(2), j),
                    g_plus.row(j),
                    g_minus.row(j),
                )
            })
            .collect::<Result<Vec<Array2<Complex>>>>()?;
        let mut vhat = Array3::<Complex>::zeros((m, n, p));
        for (j, x) in modes.iter().enumerate() {
            vhat.slice_mut(s![.., j, ..]).assign(x);
        }
        Ok(BallFunction::from_coeffs(vhat))
    }

    fn solve_mode(
        &self,
        j: usize,
        f: ArrayView2<Complex>,
        g_plus: ArrayView1<Complex>,
        g_minus: ArrayView1<Complex>,
    ) -> Result<Array2<Complex>> {
        if max_abs(&f) < ZERO_MODE_TOL
            && max_abs(&g_plus) < ZERO_MODE_TOL
            && max_abs(&g_minus) < ZERO_MODE_TOL
        {
            return Ok(Array2::zeros((self.m, self.p)));
        }
        let az = self.azimuthal[j];
        if self.kind == BoundaryKind::Neumann && self.k == 0. && az == 0. {
            return self.solve_singular_mode(f, g_plus, g_minus);
        }
        let reduced = self.reduce(&self.ops, az, &f, &g_plus, &g_minus);
        let y = reduced.sylv.solve(&reduced.rhs)?;
        Ok(reduced.reconstruct(&y))
    }

    /// Neumann mode k = 0 at K = 0, unique up to a constant
    fn solve_singular_mode(
        &self,
        f: ArrayView2<Complex>,
        g_plus: ArrayView1<Complex>,
        g_minus: ArrayView1<Complex>,
    ) -> Result<Array2<Complex>> {
        let m_pad = pad_len(self.m, Parity::Even);
        let p_pad = pad_len(self.p, Parity::Odd);
        let ops = OperatorMatrices::new(m_pad, p_pad);
        let f = resize_fourier(&resize_chebyshev(&f, 0, m_pad), 1, p_pad);
        let g_plus = resize_fourier(&g_plus, 0, p_pad);
        let g_minus = resize_fourier(&g_minus, 0, p_pad);
        let reduced = self.reduce(&ops, 0., &f, &g_plus, &g_minus);
        // T_0 at polar wavenumber zero is the constant
        let y = reduced.sylv.lstsq_kron(&reduced.rhs, &[(0, p_pad / 2)])?;
        let defect = reduced.sylv.residual(&y, &reduced.rhs);
        if defect > COMPATIBILITY_TOL {
            warn!(
                "Neumann data violate the compatibility condition, relative defect {:e}",
                defect
            );
        } else {
            debug!("Singular Neumann mode solved with defect {:e}", defect);
        }
        let x = reduced.reconstruct(&y);
        Ok(resize_fourier(&resize_chebyshev(&x, 0, self.m), 1, self.p))
    }

    /// Sylvester equation of one mode with the boundary rows eliminated
    fn reduce(
        &self,
        ops: &OperatorMatrices,
        az: Real,
        f: &ArrayBase<impl ndarray::Data<Elem = Complex>, Ix2>,
        g_plus: &ArrayBase<impl ndarray::Data<Elem = Complex>, Ix1>,
        g_minus: &ArrayBase<impl ndarray::Data<Elem = Complex>, Ix1>,
    ) -> ReducedMode {
        let m = ops.m;
        let scale = if self.k.abs() > 1. {
            1. / (self.k * self.k)
        } else {
            1.
        };
        let a = (&ops.radial_diff - &(&ops.radial_mass * Complex::new(self.k * self.k, 0.)))
            * Complex::new(scale, 0.);
        let b = ops.sin2.clone();
        let c = &ops.conversion * Complex::new(scale, 0.);
        let d = ops.polar(az);
        let mut rhs = ops.radial_mass.dot(f).dot(&b.t()) * Complex::new(scale, 0.);

        // even and odd combinations of the rows at r = 1 and r = -1
        let [plus, minus] = ops.boundary_rows(self.kind);
        let rows = [(&plus + &minus) / 2., (&plus - &minus) / 2.];
        let data = [
            (g_plus.to_owned() + g_minus) / Complex::new(2., 0.),
            (g_plus.to_owned() - g_minus) / Complex::new(2., 0.),
        ];
        let pivots: Vec<usize> = rows
            .iter()
            .map(|row| row.iter().rposition(|v| *v != 0.).unwrap_or(0))
            .collect();
        let keep: Vec<usize> = (0..m).filter(|i| !pivots.contains(i)).collect();

        let mut a_hat = a.select(Axis(1), &keep);
        let mut c_hat = c.select(Axis(1), &keep);
        let mut eliminate = |row: &Array1<Real>, g: &Array1<Complex>, piv: usize| {
            let r_tilde: Array1<Complex> = keep
                .iter()
                .map(|&i| Complex::new(row[i] / row[piv], 0.))
                .collect();
            let g_tilde = g / Complex::new(row[piv], 0.);
            let a_col = a.column(piv).to_owned();
            let c_col = c.column(piv).to_owned();
            a_hat -= &outer(&a_col, &r_tilde);
            c_hat -= &outer(&c_col, &r_tilde);
            rhs -= &outer(&a_col, &g_tilde).dot(&b.t());
            rhs -= &outer(&c_col, &g_tilde).dot(&d.t());
            (piv, r_tilde, g_tilde)
        };
        let eliminated = [
            eliminate(&rows[0], &data[0], pivots[0]),
            eliminate(&rows[1], &data[1], pivots[1]),
        ];
        let sylv = Sylvester::new(
            a_hat.slice(s![..m - 2, ..]).to_owned(),
            b,
            c_hat.slice(s![..m - 2, ..]).to_owned(),
            d,
        );
        ReducedMode {
            sylv,
            rhs: rhs.slice(s![..m - 2, ..]).to_owned(),
            eliminated,
            keep,
        }
    }
}

impl ReducedMode {
    /// Full coefficient matrix from the reduced solution
    fn reconstruct(&self, y: &Array2<Complex>) -> Array2<Complex> {
        let m = self.keep.len() + 2;
        let mut x = Array2::<Complex>::zeros((m, y.ncols()));
        for (row, &i) in y.outer_iter().zip(self.keep.iter()) {
            x.row_mut(i).assign(&row);
        }
        for (piv, r_tilde, g_tilde) in &self.eliminated {
            let value = g_tilde - &r_tilde.dot(y);
            x.row_mut(*piv).assign(&value);
        }
        x
    }
}

fn outer(u: &Array1<Complex>, v: &Array1<Complex>) -> Array2<Complex> {
    Array2::from_shape_fn((u.len(), v.len()), |(i, j)| u[i] * v[j])
}

/// Solve `lap(u) - K^2 u = f` with `u = g` on the sphere
///
/// # Errors
/// See [`BallHelmholtz::new`] and [`BallHelmholtz::solve`].
pub fn helmholtz(f: &Rhs, k: Real, bc: &BoundaryData, m: usize, n: usize, p: usize) -> Result<BallFunction> {
    BallHelmholtz::new(m, n, p, k, BoundaryKind::Dirichlet)?.solve(f, bc)
}

/// Solve `lap(u) - K^2 u = f` with `du/dr = h` on the sphere.
///
/// For K = 0 the solution is determined up to a constant.
///
/// # Errors
/// See [`BallHelmholtz::new`] and [`BallHelmholtz::solve`].
pub fn helmholtz_neumann(
    f: &Rhs,
    k: Real,
    bc: &BoundaryData,
    m: usize,
    n: usize,
    p: usize,
) -> Result<BallFunction> {
    BallHelmholtz::new(m, n, p, k, BoundaryKind::Neumann)?.solve(f, bc)
}

/// Solve `lap(u) = f` with `u = g` on the sphere
///
/// # Errors
/// See [`helmholtz`].
pub fn poisson(f: &Rhs, bc: &BoundaryData, m: usize, n: usize, p: usize) -> Result<BallFunction> {
    helmholtz(f, 0., bc, m, n, p)
}
