//! Collocation grid on an interval
use crate::bases::chebyshev::{
    bary_eval, bary_weights_2nd, clenshaw, cumsum_coeffs, interp_matrix, nodes_1st_kind,
    quadrature_weights,
};
use crate::bases::Chebyshev;
use crate::field::points;
use crate::Real;
use ndarray::prelude::*;
use ndarray::Data;
use std::cell::RefCell;

/// Second kind Chebyshev points on `domain` with their
/// differentiation matrix
pub struct Grid {
    /// Number of points
    pub n: usize,
    /// Interval
    pub domain: [Real; 2],
    /// Points, ascending
    pub x: Array1<Real>,
    weights: Array1<Real>,
    quad: Array1<Real>,
    d1: Array2<Real>,
    cheby: RefCell<Chebyshev>,
}

impl Grid {
    /// Return grid of `n` points
    pub fn new(n: usize, domain: [Real; 2]) -> Self {
        let cheby = Chebyshev::new(n);
        let [a, b] = domain;
        let d1 = cheby.diff_matrix() * (2. / (b - a));
        Grid {
            n,
            domain,
            x: points(domain, n),
            weights: bary_weights_2nd(n),
            quad: quadrature_weights(n) * ((b - a) / 2.),
            d1,
            cheby: RefCell::new(cheby),
        }
    }

    /// Differentiation matrix of order `order`
    pub fn diff_matrix(&self, order: usize) -> Array2<Real> {
        let mut d = Array2::eye(self.n);
        for _ in 0..order {
            d = self.d1.dot(&d);
        }
        d
    }

    /// Derivative of order `order` of grid values
    pub fn diff<S: Data<Elem = Real>>(&self, v: &ArrayBase<S, Ix1>, order: usize) -> Array1<Real> {
        let mut out = v.to_owned();
        for _ in 0..order {
            out = self.d1.dot(&out);
        }
        out
    }

    /// Evaluate the interpolant of grid values at x
    pub fn eval<S: Data<Elem = Real>>(&self, v: &ArrayBase<S, Ix1>, x: Real) -> Real {
        bary_eval(&self.x, &self.weights, v, x)
    }

    /// Resampling matrix to `m` first kind points, identity for `m == n`
    pub fn projection(&self, m: usize) -> Array2<Real> {
        if m == self.n {
            return Array2::eye(m);
        }
        let [a, b] = self.domain;
        let target = nodes_1st_kind(m).mapv(|s| 0.5 * (a + b) + 0.5 * (b - a) * s);
        interp_matrix(&self.x, &self.weights, &target)
    }

    /// Definite integral of grid values over the domain
    pub fn integrate<S: Data<Elem = Real>>(&self, v: &ArrayBase<S, Ix1>) -> Real {
        self.quad.dot(v)
    }

    /// Indefinite integral of grid values, vanishing at the left end
    pub fn cumsum<S: Data<Elem = Real>>(&self, v: &ArrayBase<S, Ix1>) -> Array1<Real> {
        let [a, b] = self.domain;
        let mut cheby = self.cheby.borrow_mut();
        let c = cumsum_coeffs(&cheby.forward(v)) * ((b - a) / 2.);
        // one coefficient more than the grid holds
        cheby.x.mapv(|s| clenshaw(&c, s))
    }
}
