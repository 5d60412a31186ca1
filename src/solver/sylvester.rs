//! Generalized Sylvester equations
//!
//! Solves
//! .. math::
//!
//!  A X B^T + C X D^T = F
//!
//! for X of size (q x p), with A, C of size (q x q) and B, D of
//! size (p x p).
//!
//! Derivation:
//!
//! Diagonalize B^-T D^T = W lam W^-1 and substitute Z = X B^T W.
//! Multiplying the equation by W from the right decouples the
//! columns of Z:
//! .. math::
//!
//!  (A + lam_j C) z_j = (F W)_j
//!
//! Finally X = Z W^-1 B^-T.
//!
//! The eigenvector matrix may be ill conditioned, hence the residual
//! of the result is checked. If it is too large, the equation is solved
//! as one dense system `(B x A + D x C) vec(X) = vec(F)` instead.
use super::utils::{kron, max_abs, unvec_col_major, vec_col_major};
use crate::error::Result;
use crate::Complex;
use log::debug;
use ndarray::prelude::*;
use ndarray_linalg::{Eig, Inverse, LeastSquaresSvd, Solve};

/// Accepted relative residual of the diagonalized solve
const RESIDUAL_TOL: f64 = 1e-10;

/// Generalized Sylvester operator `X -> A X B^T + C X D^T`
#[derive(Debug, Clone)]
pub struct Sylvester {
    /// Left factor of the first term (q x q)
    pub a: Array2<Complex>,
    /// Right factor of the first term (p x p)
    pub b: Array2<Complex>,
    /// Left factor of the second term (q x q)
    pub c: Array2<Complex>,
    /// Right factor of the second term (p x p)
    pub d: Array2<Complex>,
}

impl Sylvester {
    /// Return new operator
    pub fn new(a: Array2<Complex>, b: Array2<Complex>, c: Array2<Complex>, d: Array2<Complex>) -> Self {
        assert!(a.is_square() && c.is_square() && a.dim() == c.dim());
        assert!(b.is_square() && d.is_square() && b.dim() == d.dim());
        Sylvester { a, b, c, d }
    }

    /// Apply the operator to X
    pub fn apply(&self, x: &Array2<Complex>) -> Array2<Complex> {
        self.a.dot(x).dot(&self.b.t()) + self.c.dot(x).dot(&self.d.t())
    }

    /// Max norm of the residual, relative to the size of the terms
    pub fn residual(&self, x: &Array2<Complex>, f: &Array2<Complex>) -> f64 {
        let res = max_abs(&(self.apply(x) - f));
        let scale = max_abs(&self.a) * max_abs(x) * max_abs(&self.b)
            + max_abs(&self.c) * max_abs(x) * max_abs(&self.d)
            + max_abs(f);
        if scale == 0. {
            0.
        } else {
            res / scale
        }
    }

    /// Solve `A X B^T + C X D^T = F`
    ///
    /// # Errors
    /// Failure of the dense fallback solver (singular operator).
    pub fn solve(&self, f: &Array2<Complex>) -> Result<Array2<Complex>> {
        match self.solve_diagonalized(f) {
            Ok(x) => {
                let res = self.residual(&x, f);
                if res <= RESIDUAL_TOL {
                    return Ok(x);
                }
                debug!("Diagonalized sylvester solve has residual {:e}, fall back to kronecker", res);
            }
            Err(e) => debug!("Diagonalized sylvester solve failed ({}), fall back to kronecker", e),
        }
        self.solve_kron(f)
    }

    /// Solve by diagonalizing the right factors
    pub fn solve_diagonalized(&self, f: &Array2<Complex>) -> Result<Array2<Complex>> {
        let bt_inv = self.b.t().inv()?;
        let (lam, w) = bt_inv.dot(&self.d.t()).eig()?;
        let w_inv = w.inv()?;
        let g = f.dot(&w);
        let mut z = Array2::<Complex>::zeros(f.raw_dim());
        for (j, lam_j) in lam.iter().enumerate() {
            let lhs = &self.a + &(&self.c * *lam_j);
            let zj = lhs.solve(&g.column(j).to_owned())?;
            z.column_mut(j).assign(&zj);
        }
        Ok(z.dot(&w_inv).dot(&bt_inv))
    }

    /// Dense operator acting on the column-major vectorization of X
    pub fn kron_matrix(&self) -> Array2<Complex> {
        kron(&self.b, &self.a) + kron(&self.d, &self.c)
    }

    /// Solve the vectorized system with a dense LU
    pub fn solve_kron(&self, f: &Array2<Complex>) -> Result<Array2<Complex>> {
        let (q, p) = f.dim();
        let x = self.kron_matrix().solve(&vec_col_major(f))?;
        Ok(unvec_col_major(&x, q, p))
    }

    /// Least squares solve of the vectorized system, with the unknowns
    /// at positions `fixed` removed (set to zero).
    ///
    /// Used for singular operators, where the removed unknowns span the
    /// null space.
    pub fn lstsq_kron(&self, f: &Array2<Complex>, fixed: &[(usize, usize)]) -> Result<Array2<Complex>> {
        let (q, p) = f.dim();
        let removed: Vec<usize> = fixed.iter().map(|(i, j)| i + q * j).collect();
        let keep: Vec<usize> = (0..q * p).filter(|k| !removed.contains(k)).collect();
        let mat = self.kron_matrix().select(Axis(1), &keep);
        let sol = mat.least_squares(&vec_col_major(f))?.solution;
        let mut x = Array1::<Complex>::zeros(q * p);
        for (k, v) in keep.iter().zip(sol.iter()) {
            x[*k] = *v;
        }
        Ok(unvec_col_major(&x, q, p))
    }
}
