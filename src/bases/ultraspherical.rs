//! # Ultraspherical
//! Banded operators in coefficient space which map Chebyshev (T)
//! coefficients to ultraspherical C^(λ) coefficients.
//!
//! `lambda = 0` denotes the Chebyshev T basis itself. Differentiation
//! of order k maps T to C^(k), the conversions raise λ by one, and
//! the multiplication by x keeps λ. Composing them yields sparse,
//! well conditioned discretizations of variable coefficient operators.
use crate::Real;
use ndarray::prelude::*;

/// Differentiation of order `order` from T to C^(order)
///
/// T_j maps to `2^(k-1) (k-1)! j C^(k)_(j-k)`.
pub fn diff_mat(n: usize, order: usize) -> Array2<Real> {
    if order == 0 {
        return Array2::eye(n);
    }
    let mut scale = 2f64.powi(order as i32 - 1);
    for i in 1..order {
        scale *= i as Real;
    }
    let mut d = Array2::<Real>::zeros((n, n));
    for j in order..n {
        d[[j - order, j]] = scale * j as Real;
    }
    d
}

/// Conversion from C^(λ) to C^(λ+1)
pub fn convert_mat(n: usize, lambda: usize) -> Array2<Real> {
    let mut s = Array2::<Real>::zeros((n, n));
    if lambda == 0 {
        for j in 0..n {
            s[[j, j]] = if j == 0 { 1. } else { 0.5 };
            if j >= 2 {
                s[[j - 2, j]] = -0.5;
            }
        }
    } else {
        let lam = lambda as Real;
        for j in 0..n {
            s[[j, j]] = lam / (j as Real + lam);
            if j >= 2 {
                s[[j - 2, j]] = -lam / (j as Real + lam);
            }
        }
    }
    s
}

/// Multiplication by x in C^(λ); the highest mode is truncated
pub fn mult_x(n: usize, lambda: usize) -> Array2<Real> {
    let mut m = Array2::<Real>::zeros((n, n));
    if lambda == 0 {
        for j in 0..n {
            if j + 1 < n {
                m[[j + 1, j]] = if j == 0 { 1. } else { 0.5 };
            }
            if j >= 1 {
                m[[j - 1, j]] = 0.5;
            }
        }
    } else {
        let lam = lambda as Real;
        for j in 0..n {
            let denom = 2. * (j as Real + lam);
            if j + 1 < n {
                m[[j + 1, j]] = (j as Real + 1.) / denom;
            }
            if j >= 1 {
                m[[j - 1, j]] = (j as Real + 2. * lam - 1.) / denom;
            }
        }
    }
    m
}

/// Conversion from T to C^(order), the product of `order` conversions
pub fn convert_chain(n: usize, order: usize) -> Array2<Real> {
    let mut s = Array2::<Real>::eye(n);
    for lambda in 0..order {
        s = convert_mat(n, lambda).dot(&s);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bases::Chebyshev;

    fn approx_eq<S, D>(result: &ArrayBase<S, D>, expected: &ArrayBase<S, D>)
    where
        S: ndarray::Data<Elem = f64>,
        D: Dimension,
    {
        let dif = 1e-10;
        for (a, b) in expected.iter().zip(result.iter()) {
            if (a - b).abs() > dif {
                panic!("Large difference of values, got {} expected {}.", b, a)
            }
        }
    }

    /// C^(2) polynomials by recurrence
    fn c2(n: usize, x: f64) -> Array1<f64> {
        let mut c = Array1::<f64>::zeros(n);
        for k in 0..n {
            c[k] = match k {
                0 => 1.,
                1 => 4. * x,
                _ => (2. * x * (k as f64 + 1.) * c[k - 1] - (k as f64 + 2.) * c[k - 2]) / k as f64,
            };
        }
        c
    }

    #[test]
    fn test_second_derivative_in_c2() {
        // u = x^4: u'' = 12 x^2, compare values of the C^(2) series
        let n = 8;
        let mut cheby = Chebyshev::new(n);
        let coeffs = cheby.forward(&cheby.x.mapv(|x| x.powi(4)));
        let d2 = diff_mat(n, 2).dot(&coeffs);
        for x in [-0.7, 0.1, 0.55] {
            let value = c2(n, x).dot(&d2);
            assert!((value - 12. * x * x).abs() < 1e-10);
        }
    }

    #[test]
    fn test_conversion_preserves_values() {
        let n = 7;
        let mut cheby = Chebyshev::new(n);
        let coeffs = cheby.forward(&cheby.x.mapv(|x| (x + 0.3).powi(3)));
        let conv = convert_chain(n, 2).dot(&coeffs);
        for x in [-0.9, 0.2, 0.8] {
            let value = c2(n, x).dot(&conv);
            assert!((value - (x + 0.3).powi(3)).abs() < 1e-10);
        }
    }

    #[test]
    fn test_mult_x() {
        let n = 6;
        // x * T_1 = (T_0 + T_2)/2
        let mut t1 = Array1::<f64>::zeros(n);
        t1[1] = 1.;
        approx_eq(&mult_x(n, 0).dot(&t1), &array![0.5, 0., 0.5, 0., 0., 0.]);
        // x * C2_0 = 4x/4 = C2_1 / 4
        let mut c0 = Array1::<f64>::zeros(n);
        c0[0] = 1.;
        approx_eq(&mult_x(n, 2).dot(&c0), &array![0., 0.25, 0., 0., 0., 0.]);
    }
}
